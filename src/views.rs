//! HTML rendering for the web front end.
//!
//! Pages share one layout. Every piece of user-supplied text goes through
//! [`escape`] before it reaches the markup.

use std::fmt::Write;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::model::{Event, Symptom};

/// Site-wide values every page needs.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub environment: String,
}

impl Site {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            name: "Symptoms".to_string(),
            environment: "production".to_string(),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Element id for pairing a label with its input.
fn unique_id() -> String {
    format!("f-{}", Uuid::new_v4().simple())
}

fn layout(site: &Site, title: &str, body: &str) -> String {
    let banner = if site.is_development() {
        format!(r#"<div class="env-banner">{} environment</div>"#, escape(&site.environment))
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | {site}</title>
<link rel="stylesheet" href="/static/styles/main.css">
</head>
<body>
{banner}<header><a href="/">{site}</a> <nav><a href="/symptoms">Symptoms</a> <a href="/symptoms/add">Add</a> <a href="/symptoms/report">Report</a></nav></header>
<main>
{body}</main>
<footer>&copy; {year} {site}</footer>
<script src="/static/scripts/main.js"></script>
</body>
</html>
"#,
        title = escape(title),
        site = escape(&site.name),
        banner = banner,
        body = body,
        year = Utc::now().year(),
    )
}

fn field(label: &str, name: &str, value: &str, multiline: bool) -> String {
    let id = unique_id();
    let input = if multiline {
        format!(r#"<textarea id="{id}" name="{name}">{}</textarea>"#, escape(value))
    } else {
        format!(r#"<input id="{id}" type="text" name="{name}" value="{}">"#, escape(value))
    };
    format!("<p><label for=\"{id}\">{label}</label>\n{input}</p>\n")
}

fn symptom_fields(symptom: Option<&Symptom>) -> String {
    let (title, author, description) = match symptom {
        Some(s) => (s.title.as_str(), s.author.as_str(), s.description.as_str()),
        None => ("", "", ""),
    };
    let mut out = String::new();
    out.push_str(&field("Title", "title", title, false));
    out.push_str(&field("Author", "author", author, false));
    out.push_str(&field("Description", "description", description, true));
    out
}

pub fn index(site: &Site) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>Keep track of symptoms and everything that happens to them.</p>\n<p><a href=\"/symptoms\">View symptoms</a></p>\n",
        escape(&site.name)
    );
    layout(site, "Home", &body)
}

pub fn not_found(site: &Site) -> String {
    layout(
        site,
        "Uh oh",
        "<h1>Page not found</h1>\n<p>There is nothing here. <a href=\"/\">Go home</a>.</p>\n",
    )
}

pub fn error_page(site: &Site, heading: &str, message: &str) -> String {
    let body = format!("<h1>{}</h1>\n<p>{}</p>\n", escape(heading), escape(message));
    layout(site, heading, &body)
}

pub fn symptom_list(site: &Site, symptoms: &[Symptom]) -> String {
    let mut body = String::from("<h1>Symptoms</h1>\n<p><a href=\"/symptoms/add\">Add a symptom</a></p>\n");
    if symptoms.is_empty() {
        body.push_str("<p class=\"empty\">No symptoms yet.</p>\n");
    } else {
        body.push_str("<ul class=\"symptoms\">\n");
        for s in symptoms {
            let _ = write!(
                body,
                concat!(
                    "<li><a href=\"/symptoms/{id}\">{title}</a> by {author}",
                    "<form method=\"post\" action=\"/symptoms/remove\">",
                    "<input type=\"hidden\" name=\"id\" value=\"{id}\">",
                    "<button type=\"submit\">Remove</button></form></li>\n"
                ),
                id = s.id,
                title = escape(&s.title),
                author = escape(&s.author),
            );
        }
        body.push_str("</ul>\n");
    }
    layout(site, "Symptoms", &body)
}

pub fn add_form(site: &Site) -> String {
    let body = format!(
        "<h1>Add Symptom</h1>\n<form method=\"post\" action=\"/symptoms/add\">\n{}<button type=\"submit\">Save</button>\n</form>\n",
        symptom_fields(None)
    );
    layout(site, "Add Symptom", &body)
}

pub fn symptom_detail(site: &Site, symptom: &Symptom, events: &[Event]) -> String {
    let mut body = format!(
        "<h1>{title}</h1>\n<form method=\"post\" action=\"/symptoms/{id}\">\n{fields}<button type=\"submit\">Update</button>\n</form>\n<h2>History</h2>\n",
        title = escape(&symptom.title),
        id = symptom.id,
        fields = symptom_fields(Some(symptom)),
    );

    if events.is_empty() {
        body.push_str("<p class=\"empty\">No events recorded.</p>\n");
    } else {
        body.push_str("<ol class=\"events\">\n");
        for e in events {
            let _ = writeln!(
                body,
                "<li><time datetime=\"{}\">{}</time> {}</li>",
                e.time.to_rfc3339(),
                e.pretty_time(),
                e.title()
            );
        }
        body.push_str("</ol>\n");
    }
    layout(site, &symptom.title, &body)
}

pub fn report(site: &Site, symptoms: &[Symptom]) -> String {
    let mut body = format!("<h1>Symptom Report</h1>\n<p>{} symptom(s) on record.</p>\n", symptoms.len());
    body.push_str("<table>\n<thead><tr><th>#</th><th>Title</th><th>Author</th><th>Description</th></tr></thead>\n<tbody>\n");
    for s in symptoms {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            s.id,
            escape(&s.title),
            escape(&s.author),
            escape(&s.description)
        );
    }
    body.push_str("</tbody>\n</table>\n");
    layout(site, "Report", &body)
}

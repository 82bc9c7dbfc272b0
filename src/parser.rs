use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, value},
    multi::many1,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    List,
    Get { id: u64 },
    Add { title: String, author: String, description: String },
    Update { id: u64, title: Option<String>, author: Option<String>, description: Option<String> },
    Delete { id: u64 },
    Events { id: Option<u64> },
    Help,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Author,
    Description,
}

// --- BASIC PARSERS ---

fn parse_u64(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

/// `"..."` with `\"` and `\\` escapes.
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = opt(escaped_transform(
        is_not("\\\""),
        '\\',
        alt((value("\\", tag("\\")), value("\"", tag("\"")))),
    ))(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.unwrap_or_default()))
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn parse_field(input: &str) -> IResult<&str, Field> {
    alt((
        value(Field::Title, tag_ci("TITLE")),
        value(Field::Author, tag_ci("AUTHOR")),
        value(Field::Description, tag_ci("DESCRIPTION")),
    ))(input)
}

fn parse_assignment(input: &str) -> IResult<&str, (Field, String)> {
    let (input, field) = parse_field(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, text) = parse_quoted_string(input)?;
    Ok((input, (field, text)))
}

// --- COMMAND PARSERS ---

fn parse_list(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("LIST"), tag_ci("LS")))(input)?;
    Ok((input, Command::List))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("GET"), tag_ci("SHOW")))(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    Ok((input, Command::Get { id }))
}

fn parse_add(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("ADD")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, (title, author, description)) = tuple((
        ws(parse_quoted_string),
        ws(parse_quoted_string),
        ws(parse_quoted_string),
    ))(input)?;
    Ok((input, Command::Add { title, author, description }))
}

fn parse_update(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("UPDATE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    let (input, _) = ws(tag_ci("SET"))(input)?;
    let (input, assignments) = many1(terminated(ws(parse_assignment), opt(char(','))))(input)?;

    let (mut title, mut author, mut description) = (None, None, None);
    // Later assignments to the same field win
    for (field, text) in assignments {
        match field {
            Field::Title => title = Some(text),
            Field::Author => author = Some(text),
            Field::Description => description = Some(text),
        }
    }
    Ok((input, Command::Update { id, title, author, description }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("DELETE"), tag_ci("REMOVE")))(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    Ok((input, Command::Delete { id }))
}

fn parse_events(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EVENTS"), tag_ci("HISTORY")))(input)?;
    let (input, id) = opt(preceded(multispace1, parse_u64))(input)?;
    Ok((input, Command::Events { id }))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    map(tag_ci("HELP"), |_| Command::Help)(input)
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_events,
        parse_list,
        parse_get,
        parse_add,
        parse_update,
        parse_delete,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context = if e.input.chars().count() > 20 {
                format!("{}...", e.input.chars().take(20).collect::<String>())
            } else {
                e.input.to_string()
            };
            Err(format!("Invalid syntax near: '{}'", context))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

use super::Migration;
use crate::constants::{DIRECTIVE_SENTINEL, LINE_COMMENT, MAX_NAME_LENGTH};
use crate::error::{ParseError, ParseErrorKind};
use tracing::debug;

/// Parser position within a change-script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    /// `Up` seen, waiting for `BeginBlock`
    UpHeader,
    InUpBlock,
    /// `Down` seen, waiting for `BeginBlock`
    DownHeader,
    InDownBlock,
}

impl ParseState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::UpHeader => "dangling Up header",
            Self::InUpBlock => "open Up block",
            Self::DownHeader => "dangling Down header",
            Self::InDownBlock => "open Down block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Name(String),
    Index(i64),
    Up,
    Down,
    BeginBlock,
    EndBlock,
}

impl Directive {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Name(_) => "Name",
            Self::Index(_) => "Index",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::BeginBlock => "BeginBlock",
            Self::EndBlock => "EndBlock",
        }
    }
}

enum LineKind {
    Blank,
    /// Ordinary SQL line comment, not a directive
    Comment,
    Content,
    Directive(Directive),
}

/// Parse a change-script given as a sequence of lines.
///
/// Block content is captured line by line, each line followed by `\n`, and
/// is not trimmed: a block holding the single line `T` yields `"T\n"`.
pub fn parse_migration<I, S>(lines: I) -> Result<Migration, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut state = ParseState::Start;
    let mut name: Option<String> = None;
    let mut index: Option<i64> = None;
    let mut up = String::new();
    let mut down = String::new();

    for (offset, raw) in lines.into_iter().enumerate() {
        let line_num = offset + 1;
        let raw = raw.as_ref();
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let kind = classify_line(line, line_num)?;

        match state {
            ParseState::Start => match kind {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Content => {
                    return Err(ParseError::new(
                        ParseErrorKind::StrayContent,
                        Some(line_num),
                        "Script content must be inside an Up or Down block",
                    ));
                }
                LineKind::Directive(Directive::Name(value)) => {
                    if let Some(previous) = name.replace(value) {
                        debug!("Name directive at line {} overrides '{}'", line_num, previous);
                    }
                }
                LineKind::Directive(Directive::Index(value)) => {
                    if let Some(previous) = index.replace(value) {
                        debug!("Index directive at line {} overrides {}", line_num, previous);
                    }
                }
                LineKind::Directive(Directive::Up) => state = ParseState::UpHeader,
                LineKind::Directive(Directive::Down) => state = ParseState::DownHeader,
                LineKind::Directive(directive) => {
                    return Err(ParseError::new(
                        ParseErrorKind::OutOfOrderDirective,
                        Some(line_num),
                        format!(
                            "{} must follow an Up or Down directive",
                            directive.keyword()
                        ),
                    ));
                }
            },
            ParseState::UpHeader | ParseState::DownHeader => match kind {
                LineKind::Blank => {}
                LineKind::Directive(Directive::BeginBlock) => {
                    state = if state == ParseState::UpHeader {
                        ParseState::InUpBlock
                    } else {
                        ParseState::InDownBlock
                    };
                }
                other => {
                    let header = if state == ParseState::UpHeader {
                        "Up"
                    } else {
                        "Down"
                    };
                    let found = match other {
                        LineKind::Directive(directive) => format!("{} directive", directive.keyword()),
                        _ => "script content".to_string(),
                    };
                    return Err(ParseError::new(
                        ParseErrorKind::OutOfOrderDirective,
                        Some(line_num),
                        format!("{header} must be followed by BeginBlock, found {found}"),
                    ));
                }
            },
            ParseState::InUpBlock | ParseState::InDownBlock => match kind {
                LineKind::Directive(Directive::EndBlock) => state = ParseState::Start,
                LineKind::Directive(directive) => {
                    return Err(ParseError::new(
                        ParseErrorKind::ForbiddenDirective,
                        Some(line_num),
                        format!(
                            "Only EndBlock is allowed inside a block, found {}",
                            directive.keyword()
                        ),
                    ));
                }
                LineKind::Blank | LineKind::Comment | LineKind::Content => {
                    let block = if state == ParseState::InUpBlock {
                        &mut up
                    } else {
                        &mut down
                    };
                    block.push_str(line);
                    block.push('\n');
                }
            },
        }
    }

    if state != ParseState::Start {
        return Err(ParseError::new(
            ParseErrorKind::UnterminatedBlock,
            None,
            format!("Script ended with {}", state.describe()),
        ));
    }

    let name = name.ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::MissingField,
            None,
            "Name directive is required",
        )
    })?;
    let index = index.ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::MissingField,
            None,
            "Index directive is required",
        )
    })?;

    let migration = Migration::new(index, name, up);
    if down.is_empty() {
        Ok(migration)
    } else {
        Ok(migration.with_down(down))
    }
}

/// Parse a whole change-script held in memory
pub fn parse_migration_str(text: &str) -> Result<Migration, ParseError> {
    parse_migration(text.lines())
}

/// Render a migration back into change-script text
pub fn render_migration(migration: &Migration) -> String {
    let mut out = String::new();
    let directive = |out: &mut String, body: &str| {
        out.push_str(LINE_COMMENT);
        out.push(' ');
        out.push_str(DIRECTIVE_SENTINEL);
        out.push(' ');
        out.push_str(body);
        out.push('\n');
    };

    directive(&mut out, &format!("Name {}", migration.name()));
    directive(&mut out, &format!("Index {}", migration.index()));
    directive(&mut out, "Up");
    directive(&mut out, "BeginBlock");
    push_block(&mut out, migration.command());
    directive(&mut out, "EndBlock");

    if let Some(down) = migration.down_command() {
        directive(&mut out, "Down");
        directive(&mut out, "BeginBlock");
        push_block(&mut out, down);
        directive(&mut out, "EndBlock");
    }

    out
}

fn push_block(out: &mut String, body: &str) {
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
}

fn classify_line(line: &str, line_num: usize) -> Result<LineKind, ParseError> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(LineKind::Blank);
    }

    let Some(comment) = trimmed.strip_prefix(LINE_COMMENT) else {
        return Ok(LineKind::Content);
    };

    match strip_sentinel(comment.trim_start()) {
        Some(body) => parse_directive(body.trim(), line_num).map(LineKind::Directive),
        None => Ok(LineKind::Comment),
    }
}

/// Returns the directive body when `text` starts with the sentinel token
fn strip_sentinel(text: &str) -> Option<&str> {
    let prefix = text.get(..DIRECTIVE_SENTINEL.len())?;
    if !prefix.eq_ignore_ascii_case(DIRECTIVE_SENTINEL) {
        return None;
    }

    let rest = &text[DIRECTIVE_SENTINEL.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn parse_directive(body: &str, line_num: usize) -> Result<Directive, ParseError> {
    let malformed =
        |message: String| ParseError::new(ParseErrorKind::MalformedDirective, Some(line_num), message);

    if body.is_empty() {
        return Err(malformed("Directive keyword is missing".to_string()));
    }

    let (keyword, argument) = match body.split_once(char::is_whitespace) {
        Some((keyword, argument)) => (keyword, argument.trim()),
        None => (body, ""),
    };
    let keyword = keyword.to_ascii_lowercase();

    let no_argument = |directive: Directive| {
        if argument.is_empty() {
            Ok(directive)
        } else {
            Err(malformed(format!(
                "{} takes no argument, found '{}'",
                directive.keyword(),
                argument
            )))
        }
    };

    match keyword.as_str() {
        "name" => {
            if argument.is_empty() {
                return Err(malformed("Name directive requires a value".to_string()));
            }
            if argument.chars().count() > MAX_NAME_LENGTH {
                return Err(malformed(format!(
                    "Name is longer than {} characters",
                    MAX_NAME_LENGTH
                )));
            }
            Ok(Directive::Name(argument.to_string()))
        }
        "index" => argument
            .parse::<i64>()
            .map(Directive::Index)
            .map_err(|_| malformed(format!("Index must be an integer, found '{}'", argument))),
        "up" => no_argument(Directive::Up),
        "down" => no_argument(Directive::Down),
        "beginblock" => no_argument(Directive::BeginBlock),
        "endblock" => no_argument(Directive::EndBlock),
        _ => Err(malformed(format!("Unknown directive '{}'", keyword))),
    }
}

//! Docstring section parsing for numpy, google and sphinx styles.
//!
//! A parser turns the raw docstring into typed sections. Renderers treat each
//! section as a record with a kind, an optional title and a payload.

use std::str::FromStr;

use lazy_static::lazy_static;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

lazy_static! {
    /// `name (type): description` or `name: description`
    static ref GOOGLE_ELEMENT: Regex =
        Regex::new(r"^(\*{0,2}[\w.]+)\s*(?:\(([^)]*)\))?\s*:\s*(.*)$").unwrap();

    /// `:field [arg]: description`
    static ref SPHINX_FIELD: Regex = Regex::new(r"^:(\w+)(?:\s+([^:]+?))?\s*:\s*(.*)$").unwrap();

    /// `, default: 3`, `, default=3`, `, default 3`
    static ref NUMPY_DEFAULT: Regex = Regex::new(r",\s*default\s*[:=]?\s*(.+)$").unwrap();
}

/// What a docstring section holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Text,
    Parameters,
    OtherParameters,
    Returns,
    Yields,
    Raises,
    Warns,
    Attributes,
    Examples,
    SeeAlso,
    Notes,
    Warnings,
    Admonition,
}

impl SectionKind {
    /// Default heading used when rendering the section.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Text => "Text",
            SectionKind::Parameters => "Parameters",
            SectionKind::OtherParameters => "Other Parameters",
            SectionKind::Returns => "Returns",
            SectionKind::Yields => "Yields",
            SectionKind::Raises => "Raises",
            SectionKind::Warns => "Warns",
            SectionKind::Attributes => "Attributes",
            SectionKind::Examples => "Examples",
            SectionKind::SeeAlso => "See Also",
            SectionKind::Notes => "Notes",
            SectionKind::Warnings => "Warnings",
            SectionKind::Admonition => "Admonition",
        }
    }

    fn from_title(title: &str) -> Option<SectionKind> {
        let kind = match title.trim().to_lowercase().as_str() {
            "parameters" | "params" | "arguments" | "args" | "keyword args"
            | "keyword arguments" => SectionKind::Parameters,
            "other parameters" | "other params" => SectionKind::OtherParameters,
            "returns" | "return" => SectionKind::Returns,
            "yields" | "yield" => SectionKind::Yields,
            "raises" | "raise" | "exceptions" => SectionKind::Raises,
            "warns" => SectionKind::Warns,
            "attributes" => SectionKind::Attributes,
            "examples" | "example" => SectionKind::Examples,
            "see also" => SectionKind::SeeAlso,
            "notes" | "note" => SectionKind::Notes,
            "warnings" | "warning" => SectionKind::Warnings,
            "todo" | "tip" | "hint" | "important" | "caution" | "danger" | "attention"
            | "references" => SectionKind::Admonition,
            _ => return None,
        };
        Some(kind)
    }

    fn holds_elements(&self) -> bool {
        matches!(
            self,
            SectionKind::Parameters
                | SectionKind::OtherParameters
                | SectionKind::Returns
                | SectionKind::Yields
                | SectionKind::Raises
                | SectionKind::Warns
                | SectionKind::Attributes
        )
    }
}

/// One named entry of a parameters/returns/raises/attributes section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocstringElement {
    pub name: String,
    pub annotation: Option<String>,
    pub description: String,
    pub default: Option<String>,
}

/// A piece of an examples section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ExamplePart {
    Code(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    Elements(Vec<DocstringElement>),
    Examples(Vec<ExamplePart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocstringSection {
    pub kind: SectionKind,
    /// Heading as written in the docstring
    pub title: Option<String>,
    pub value: SectionValue,
}

impl DocstringSection {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: SectionKind::Text,
            title: None,
            value: SectionValue::Text(value.into()),
        }
    }

    /// Heading to render, falling back to the kind's default title.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(self.kind.title())
    }
}

/// A raw docstring and its parsed sections
#[derive(Debug, Clone, PartialEq)]
pub struct Docstring {
    pub value: String,
    pub parsed: Vec<DocstringSection>,
}

impl Docstring {
    pub fn new(value: impl Into<String>, parser: &dyn DocstringParser) -> Self {
        let value = value.into();
        let parsed = parser.parse(&value);
        Self { value, parsed }
    }

    /// First markdown paragraph of the leading text section, or "".
    pub fn first_paragraph(&self) -> String {
        match self.parsed.first() {
            Some(DocstringSection {
                kind: SectionKind::Text,
                value: SectionValue::Text(text),
                ..
            }) => first_markdown_paragraph(text),
            _ => String::new(),
        }
    }
}

/// Source text of the first paragraph in a markdown document.
pub fn first_markdown_paragraph(text: &str) -> String {
    Parser::new(text)
        .into_offset_iter()
        .find_map(|(event, range)| match event {
            Event::Start(Tag::Paragraph) => Some(text[range].trim().to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Produces typed sections from a raw docstring
pub trait DocstringParser: Send + Sync {
    fn parse(&self, text: &str) -> Vec<DocstringSection>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstringStyle {
    #[default]
    Numpy,
    Google,
    Sphinx,
}

impl FromStr for DocstringStyle {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numpy" => Ok(DocstringStyle::Numpy),
            "google" => Ok(DocstringStyle::Google),
            "sphinx" => Ok(DocstringStyle::Sphinx),
            other => Err(BuildError::Config(format!(
                "Unsupported docstring parser `{}`. Use one of numpy, google or sphinx.",
                other
            ))),
        }
    }
}

/// Section splitter for one docstring style
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionParser {
    style: DocstringStyle,
}

impl SectionParser {
    pub fn new(style: DocstringStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> DocstringStyle {
        self.style
    }
}

impl DocstringParser for SectionParser {
    fn parse(&self, text: &str) -> Vec<DocstringSection> {
        let text = dedent(text);
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.style {
            DocstringStyle::Numpy => parse_numpy(&text),
            DocstringStyle::Google => parse_google(&text),
            DocstringStyle::Sphinx => parse_sphinx(&text),
        }
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Remove the common indentation of all lines after the first.
fn dedent(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").trim_start();
    let rest: Vec<&str> = lines.collect();
    let common = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);

    let mut out = vec![first.to_string()];
    for line in rest {
        if line.trim().is_empty() {
            out.push(String::new());
        } else {
            out.push(line[common..].trim_end().to_string());
        }
    }
    out.join("\n")
}

fn dedent_block(lines: &[&str]) -> String {
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| if line.trim().is_empty() { "" } else { line[common..].trim_end() })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn text_section(lines: &[&str]) -> Option<DocstringSection> {
    let text = dedent_block(lines);
    (!text.is_empty()).then(|| DocstringSection::text(text))
}

fn titled_section(
    title: &str,
    kind: SectionKind,
    lines: &[&str],
    element_parser: fn(SectionKind, &[&str]) -> Vec<DocstringElement>,
) -> DocstringSection {
    let value = if kind.holds_elements() {
        SectionValue::Elements(element_parser(kind, lines))
    } else if kind == SectionKind::Examples {
        SectionValue::Examples(parse_examples(&dedent_block(lines)))
    } else {
        SectionValue::Text(dedent_block(lines))
    };
    DocstringSection {
        kind,
        title: Some(title.to_string()),
        value,
    }
}

/// Group lines into (header, continuation lines) pairs by indentation.
fn group_elements<'a>(lines: &[&'a str]) -> Vec<(&'a str, Vec<&'a str>)> {
    let base = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_of(line))
        .min()
        .unwrap_or(0);

    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for &line in lines {
        if !line.trim().is_empty() && indent_of(line) == base {
            groups.push((line.trim(), Vec::new()));
        } else if let Some((_, body)) = groups.last_mut() {
            body.push(line);
        }
    }
    groups
}

fn split_default(annotation: &str) -> (Option<String>, Option<String>) {
    let annotation = annotation.trim();
    if annotation.is_empty() {
        return (None, None);
    }
    if let Some(caps) = NUMPY_DEFAULT.captures(annotation) {
        let start = caps.get(0).map_or(annotation.len(), |m| m.start());
        let ann = annotation[..start].trim();
        let default = caps.get(1).map(|m| m.as_str().trim().to_string());
        return ((!ann.is_empty()).then(|| ann.to_string()), default);
    }
    let ann = annotation.trim_end_matches(", optional").trim();
    ((!ann.is_empty()).then(|| ann.to_string()), None)
}

// numpy -----------------------------------------------------------------

fn is_numpy_header(lines: &[&str], i: usize) -> bool {
    let Some(next) = lines.get(i + 1) else {
        return false;
    };
    let title = lines[i];
    let underline = next.trim();
    !title.trim().is_empty()
        && indent_of(title) == 0
        && underline.len() >= 3
        && underline.chars().all(|c| c == '-')
}

fn parse_numpy(text: &str) -> Vec<DocstringSection> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sections = Vec::new();
    let mut title: Option<&str> = None;
    let mut block: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if is_numpy_header(&lines, i) {
            push_numpy(&mut sections, title, &block);
            block.clear();
            title = Some(lines[i].trim());
            i += 2;
            continue;
        }
        block.push(lines[i]);
        i += 1;
    }
    push_numpy(&mut sections, title, &block);
    sections
}

fn push_numpy(sections: &mut Vec<DocstringSection>, title: Option<&str>, block: &[&str]) {
    match title {
        None => sections.extend(text_section(block)),
        Some(title) => {
            let kind = SectionKind::from_title(title).unwrap_or(SectionKind::Admonition);
            sections.push(titled_section(title, kind, block, numpy_elements));
        }
    }
}

fn numpy_elements(kind: SectionKind, lines: &[&str]) -> Vec<DocstringElement> {
    group_elements(lines)
        .into_iter()
        .map(|(header, body)| {
            let description = dedent_block(&body);
            match kind {
                SectionKind::Raises | SectionKind::Warns => DocstringElement {
                    annotation: Some(header.to_string()),
                    description,
                    ..Default::default()
                },
                SectionKind::Returns | SectionKind::Yields => match header.split_once(':') {
                    Some((name, annotation)) => DocstringElement {
                        name: name.trim().to_string(),
                        annotation: Some(annotation.trim().to_string()),
                        description,
                        default: None,
                    },
                    None => DocstringElement {
                        annotation: Some(header.to_string()),
                        description,
                        ..Default::default()
                    },
                },
                _ => {
                    let (name, rest) = header.split_once(':').unwrap_or((header, ""));
                    let (annotation, default) = split_default(rest);
                    DocstringElement {
                        name: name.trim().to_string(),
                        annotation,
                        description,
                        default,
                    }
                }
            }
        })
        .collect()
}

// google ----------------------------------------------------------------

fn google_header(line: &str) -> Option<(&str, SectionKind)> {
    if indent_of(line) != 0 {
        return None;
    }
    let title = line.trim().strip_suffix(':')?;
    SectionKind::from_title(title).map(|kind| (title, kind))
}

fn parse_google(text: &str) -> Vec<DocstringSection> {
    let mut sections = Vec::new();
    let mut current: Option<(&str, SectionKind)> = None;
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(header) = google_header(line) {
            push_google(&mut sections, current, &block);
            block.clear();
            current = Some(header);
        } else {
            block.push(line);
        }
    }
    push_google(&mut sections, current, &block);
    sections
}

fn push_google(
    sections: &mut Vec<DocstringSection>,
    header: Option<(&str, SectionKind)>,
    block: &[&str],
) {
    match header {
        None => sections.extend(text_section(block)),
        Some((title, kind)) => sections.push(titled_section(title, kind, block, google_elements)),
    }
}

fn google_elements(kind: SectionKind, lines: &[&str]) -> Vec<DocstringElement> {
    // Returns/Yields are free-form: an optional `type:` prefix then text
    if matches!(kind, SectionKind::Returns | SectionKind::Yields) {
        let text = dedent_block(lines);
        if text.is_empty() {
            return Vec::new();
        }
        let element = match text.split_once(':') {
            Some((annotation, description)) if !annotation.contains(char::is_whitespace) => {
                DocstringElement {
                    annotation: Some(annotation.to_string()),
                    description: description.trim().to_string(),
                    ..Default::default()
                }
            }
            _ => DocstringElement {
                description: text,
                ..Default::default()
            },
        };
        return vec![element];
    }

    group_elements(lines)
        .into_iter()
        .map(|(header, body)| {
            let mut element = match GOOGLE_ELEMENT.captures(header) {
                Some(caps) => {
                    let name = caps.get(1).map_or("", |m| m.as_str());
                    let first = caps.get(3).map_or("", |m| m.as_str()).to_string();
                    if matches!(kind, SectionKind::Raises | SectionKind::Warns) {
                        DocstringElement {
                            annotation: Some(name.to_string()),
                            description: first,
                            ..Default::default()
                        }
                    } else {
                        let (annotation, default) =
                            split_default(caps.get(2).map_or("", |m| m.as_str()));
                        DocstringElement {
                            name: name.to_string(),
                            annotation,
                            description: first,
                            default,
                        }
                    }
                }
                None => DocstringElement {
                    name: header.to_string(),
                    ..Default::default()
                },
            };
            let rest = dedent_block(&body);
            if !rest.is_empty() {
                if !element.description.is_empty() {
                    element.description.push('\n');
                }
                element.description.push_str(&rest);
            }
            element
        })
        .collect()
}

// sphinx ----------------------------------------------------------------

#[derive(Default)]
struct SphinxFields {
    params: Vec<DocstringElement>,
    attributes: Vec<DocstringElement>,
    raises: Vec<DocstringElement>,
    returns: Option<DocstringElement>,
}

impl SphinxFields {
    fn param(&mut self, name: &str) -> &mut DocstringElement {
        entry(&mut self.params, name)
    }

    fn attribute(&mut self, name: &str) -> &mut DocstringElement {
        entry(&mut self.attributes, name)
    }

    fn returns(&mut self) -> &mut DocstringElement {
        self.returns.get_or_insert_with(DocstringElement::default)
    }
}

fn entry<'a>(elements: &'a mut Vec<DocstringElement>, name: &str) -> &'a mut DocstringElement {
    let pos = match elements.iter().position(|el| el.name == name) {
        Some(pos) => pos,
        None => {
            elements.push(DocstringElement {
                name: name.to_string(),
                ..Default::default()
            });
            elements.len() - 1
        }
    };
    &mut elements[pos]
}

fn parse_sphinx(text: &str) -> Vec<DocstringSection> {
    let mut intro: Vec<&str> = Vec::new();
    let mut fields = SphinxFields::default();
    // description being extended by continuation lines
    let mut last: Option<(&str, String)> = None;
    let mut seen_field = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(caps) = SPHINX_FIELD.captures(trimmed) {
            seen_field = true;
            let field = caps.get(1).map_or("", |m| m.as_str());
            let arg = caps.get(2).map(|m| m.as_str().trim());
            let body = caps.get(3).map_or("", |m| m.as_str()).to_string();

            match (field, arg) {
                ("param" | "parameter" | "arg" | "argument" | "key" | "keyword", Some(arg)) => {
                    let (annotation, name) = match arg.rsplit_once(char::is_whitespace) {
                        Some((ann, name)) => (Some(ann.trim().to_string()), name),
                        None => (None, arg),
                    };
                    let el = fields.param(name);
                    el.description = body;
                    if annotation.is_some() {
                        el.annotation = annotation;
                    }
                    last = Some(("param", name.to_string()));
                }
                ("type", Some(name)) => {
                    fields.param(name).annotation = Some(body);
                    last = None;
                }
                ("var" | "ivar" | "cvar", Some(name)) => {
                    fields.attribute(name).description = body;
                    last = Some(("attribute", name.to_string()));
                }
                ("vartype", Some(name)) => {
                    fields.attribute(name).annotation = Some(body);
                    last = None;
                }
                ("returns" | "return", _) => {
                    fields.returns().description = body;
                    last = Some(("returns", String::new()));
                }
                ("rtype", _) => {
                    fields.returns().annotation = Some(body);
                    last = None;
                }
                ("raises" | "raise" | "except" | "exception", arg) => {
                    fields.raises.push(DocstringElement {
                        annotation: arg.map(str::to_string),
                        description: body,
                        ..Default::default()
                    });
                    last = Some(("raises", String::new()));
                }
                _ => last = None,
            }
        } else if !seen_field {
            intro.push(line);
        } else if !trimmed.is_empty() {
            let target = match &last {
                Some(("param", name)) => Some(fields.param(name)),
                Some(("attribute", name)) => Some(fields.attribute(name)),
                Some(("returns", _)) => Some(fields.returns()),
                Some(("raises", _)) => fields.raises.last_mut(),
                _ => None,
            };
            if let Some(el) = target {
                if !el.description.is_empty() {
                    el.description.push(' ');
                }
                el.description.push_str(trimmed);
            }
        }
    }

    let mut sections: Vec<DocstringSection> = text_section(&intro).into_iter().collect();
    let mut push = |kind: SectionKind, elements: Vec<DocstringElement>| {
        if !elements.is_empty() {
            sections.push(DocstringSection {
                kind,
                title: None,
                value: SectionValue::Elements(elements),
            });
        }
    };
    push(SectionKind::Parameters, fields.params);
    push(SectionKind::Attributes, fields.attributes);
    push(SectionKind::Returns, fields.returns.into_iter().collect());
    push(SectionKind::Raises, fields.raises);
    sections
}

// examples --------------------------------------------------------------

/// Split an examples block into doctest code and prose.
fn parse_examples(text: &str) -> Vec<ExamplePart> {
    let mut parts = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut code: Vec<&str> = Vec::new();

    fn flush_prose(parts: &mut Vec<ExamplePart>, prose: &mut Vec<&str>) {
        let text = prose.join("\n").trim().to_string();
        if !text.is_empty() {
            parts.push(ExamplePart::Text(text));
        }
        prose.clear();
    }

    for line in text.lines() {
        if line.trim_start().starts_with(">>>") {
            if code.is_empty() {
                flush_prose(&mut parts, &mut prose);
            }
            code.push(line);
        } else if !code.is_empty() {
            if line.trim().is_empty() {
                parts.push(ExamplePart::Code(code.join("\n")));
                code.clear();
            } else {
                code.push(line);
            }
        } else {
            prose.push(line);
        }
    }
    if !code.is_empty() {
        parts.push(ExamplePart::Code(code.join("\n")));
    }
    flush_prose(&mut parts, &mut prose);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(section: &DocstringSection) -> &[DocstringElement] {
        match &section.value {
            SectionValue::Elements(els) => els,
            other => panic!("expected elements, got {:?}", other),
        }
    }

    #[test]
    fn test_numpy_sections() {
        let doc = "Add two numbers.

    More detail here.

    Parameters
    ----------
    a : int
        The first number.
    b : int, default 3
        The second number.

    Returns
    -------
    int
        The sum.

    Examples
    --------
    >>> add(1, 2)
    3
    ";
        let parsed = SectionParser::new(DocstringStyle::Numpy).parse(doc);

        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0].kind, SectionKind::Text);
        assert_eq!(
            parsed[0].value,
            SectionValue::Text("Add two numbers.\n\nMore detail here.".into())
        );

        let params = elements(&parsed[1]);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].annotation.as_deref(), Some("int"));
        assert_eq!(params[0].description, "The first number.");
        assert_eq!(params[1].default.as_deref(), Some("3"));

        let returns = elements(&parsed[2]);
        assert_eq!(returns[0].annotation.as_deref(), Some("int"));

        assert_eq!(
            parsed[3].value,
            SectionValue::Examples(vec![ExamplePart::Code(">>> add(1, 2)\n3".into())])
        );
    }

    #[test]
    fn test_numpy_custom_admonition() {
        let doc = "Summary.\n\nCustom\n------\nSomething special.\n";
        let parsed = SectionParser::new(DocstringStyle::Numpy).parse(doc);
        assert_eq!(parsed[1].kind, SectionKind::Admonition);
        assert_eq!(parsed[1].display_title(), "Custom");
    }

    #[test]
    fn test_google_sections() {
        let doc = "Fetch rows.

    Args:
        table (str): Table name.
        limit (int): Maximum rows.
            Continues here.

    Returns:
        list: The rows.

    Raises:
        KeyError: If the table is missing.
    ";
        let parsed = SectionParser::new(DocstringStyle::Google).parse(doc);
        assert_eq!(parsed.len(), 4);

        let params = elements(&parsed[1]);
        assert_eq!(params[0].name, "table");
        assert_eq!(params[0].annotation.as_deref(), Some("str"));
        assert_eq!(params[1].description, "Maximum rows.\nContinues here.");

        let returns = elements(&parsed[2]);
        assert_eq!(returns[0].annotation.as_deref(), Some("list"));
        assert_eq!(returns[0].description, "The rows.");

        let raises = elements(&parsed[3]);
        assert_eq!(raises[0].annotation.as_deref(), Some("KeyError"));
    }

    #[test]
    fn test_sphinx_fields() {
        let doc = "Open a file.

    :param str path: Where to look.
    :param mode: Open mode,
        read or write.
    :type mode: str
    :returns: A handle.
    :rtype: File
    :raises OSError: When missing.
    ";
        let parsed = SectionParser::new(DocstringStyle::Sphinx).parse(doc);
        assert_eq!(parsed[0].value, SectionValue::Text("Open a file.".into()));

        let params = elements(&parsed[1]);
        assert_eq!(params[0].name, "path");
        assert_eq!(params[0].annotation.as_deref(), Some("str"));
        assert_eq!(params[1].description, "Open mode, read or write.");
        assert_eq!(params[1].annotation.as_deref(), Some("str"));

        let returns = elements(&parsed[2]);
        assert_eq!(returns[0].annotation.as_deref(), Some("File"));
        assert_eq!(parsed[3].kind, SectionKind::Raises);
    }

    #[test]
    fn test_first_paragraph() {
        let parser = SectionParser::default();
        let doc = Docstring::new("A *short* summary\nover two lines.\n\nSecond paragraph.", &parser);
        assert_eq!(doc.first_paragraph(), "A *short* summary\nover two lines.");

        let empty = Docstring::new("", &parser);
        assert_eq!(empty.first_paragraph(), "");
    }

    #[test]
    fn test_unknown_style() {
        assert!("numpydoc".parse::<DocstringStyle>().is_err());
        assert_eq!("google".parse::<DocstringStyle>().unwrap(), DocstringStyle::Google);
    }
}

//! Argument parsing: Input tokenizing and per-command option sets.
//!
//! `tokenize` turns a raw input line into tokens. `OptionSet` describes the
//! options a command accepts and sorts a token list into matched options and
//! leftover positional tokens:
//!
//! ```text
//! SAMPLE --count=3          count = "3"
//! SAMPLE -c 3               count = "3"   (required values may be the next token)
//! SAMPLE --echo:hi          echo  = Some("hi")
//! SAMPLE --option1-         option1 = Off
//! HELP SAMPLE               positional ["SAMPLE"]
//! ```
//!
//! Options may be introduced by `-`, `--` or `/`, and names match
//! case-insensitively. Option-looking tokens that name no option are left
//! in the positional list.

use std::collections::HashMap;

use crate::error::DispatchError;


// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split a raw line on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>, DispatchError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(DispatchError::parse("Unterminated quote in input."));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}


// ---------------------------------------------------------------------------
// Option specs
// ---------------------------------------------------------------------------

/// How an option consumes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Present or absent.
    Flag,
    /// Needs a value: `--count=3`, `--count:3` or `--count 3`.
    Required,
    /// May carry a value, only inline: `--echo` or `--echo=hi`.
    Optional,
    /// Three-valued switch: `--x` / `--x+` on, `--x-` off.
    Toggle,
}


/// Three-valued result of a toggle option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    #[default]
    Unset,
    On,
    Off,
}


#[derive(Debug, Clone)]
struct OptionSpec {
    names: Vec<&'static str>,
    description: &'static str,
    kind: OptionKind,
}

impl OptionSpec {
    fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// `-?, --help`, `-c, --count=VALUE`, `--echo[=VALUE]`, `--option1[+|-]`.
    fn signature(&self) -> String {
        let names: Vec<String> = self
            .names
            .iter()
            .map(|n| {
                if n.chars().count() == 1 {
                    format!("-{}", n)
                } else {
                    format!("--{}", n)
                }
            })
            .collect();
        let suffix = match self.kind {
            OptionKind::Flag => "",
            OptionKind::Required => "=VALUE",
            OptionKind::Optional => "[=VALUE]",
            OptionKind::Toggle => "[+|-]",
        };
        format!("{}{}", names.join(", "), suffix)
    }
}


/// The options one command accepts, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    specs: Vec<OptionSpec>,
}

impl OptionSet {
    pub fn new() -> Self {
        OptionSet::default()
    }

    /// Add an option. `prototype` lists its names separated by `|`.
    pub fn add(mut self, prototype: &'static str, kind: OptionKind, description: &'static str) -> Self {
        self.specs.push(OptionSpec {
            names: prototype.split('|').filter(|n| !n.is_empty()).collect(),
            description,
            kind,
        });
        self
    }

    pub fn flag(self, prototype: &'static str, description: &'static str) -> Self {
        self.add(prototype, OptionKind::Flag, description)
    }

    pub fn required(self, prototype: &'static str, description: &'static str) -> Self {
        self.add(prototype, OptionKind::Required, description)
    }

    pub fn optional(self, prototype: &'static str, description: &'static str) -> Self {
        self.add(prototype, OptionKind::Optional, description)
    }

    pub fn toggle(self, prototype: &'static str, description: &'static str) -> Self {
        self.add(prototype, OptionKind::Toggle, description)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// One `(signature, description)` row per option, for help output.
    pub fn rows(&self) -> Vec<(String, &'static str)> {
        self.specs
            .iter()
            .map(|s| (s.signature(), s.description))
            .collect()
    }

    fn find(&self, name: &str) -> Option<&OptionSpec> {
        self.specs.iter().find(|s| s.matches(name))
    }

    /// Sort `args` into matched options and positional leftovers.
    pub fn parse(&self, args: &[String]) -> Result<ParsedOptions, DispatchError> {
        let mut parsed = ParsedOptions::default();
        let mut i = 0;

        while i < args.len() {
            let token = &args[i];
            let Some(body) = strip_prefix(token) else {
                parsed.positional.push(token.clone());
                i += 1;
                continue;
            };

            let (name, inline) = split_inline_value(body);

            if let Some(spec) = self.find(name) {
                match spec.kind {
                    OptionKind::Flag | OptionKind::Toggle => {
                        if inline.is_some() {
                            return Err(DispatchError::parse(format!(
                                "Option '{}' does not take a value.",
                                token
                            )));
                        }
                        let hit = if spec.kind == OptionKind::Flag {
                            Hit::Present(None)
                        } else {
                            Hit::Toggle(Toggle::On)
                        };
                        parsed.record(spec, hit);
                    }
                    OptionKind::Optional => {
                        parsed.record(spec, Hit::Present(inline.map(str::to_string)));
                    }
                    OptionKind::Required => {
                        let value = match inline {
                            Some(v) => v.to_string(),
                            None => {
                                i += 1;
                                match args.get(i) {
                                    Some(v) => v.clone(),
                                    None => {
                                        return Err(DispatchError::parse(format!(
                                            "Missing required value for option '{}'.",
                                            token
                                        )))
                                    }
                                }
                            }
                        };
                        parsed.record(spec, Hit::Present(Some(value)));
                    }
                }
                i += 1;
                continue;
            }

            // `--name+` / `--name-` on a toggle.
            if inline.is_none() {
                if let Some((stem, state)) = split_toggle_suffix(name) {
                    if let Some(spec) = self.find(stem).filter(|s| s.kind == OptionKind::Toggle) {
                        parsed.record(spec, Hit::Toggle(state));
                        i += 1;
                        continue;
                    }
                }
            }

            parsed.positional.push(token.clone());
            i += 1;
        }

        Ok(parsed)
    }
}


fn strip_prefix(token: &str) -> Option<&str> {
    let body = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))
        .or_else(|| token.strip_prefix('/'))?;
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

fn split_inline_value(body: &str) -> (&str, Option<&str>) {
    match body.find(['=', ':']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    }
}

fn split_toggle_suffix(name: &str) -> Option<(&str, Toggle)> {
    if let Some(stem) = name.strip_suffix('+') {
        Some((stem, Toggle::On))
    } else {
        name.strip_suffix('-').map(|stem| (stem, Toggle::Off))
    }
}


// ---------------------------------------------------------------------------
// Parse result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Hit {
    Present(Option<String>),
    Toggle(Toggle),
}


/// Matched options, looked up by any of their names.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    hits: HashMap<String, Hit>,
    matched: usize,
    positional: Vec<String>,
}

impl ParsedOptions {
    fn record(&mut self, spec: &OptionSpec, hit: Hit) {
        for name in &spec.names {
            self.hits.insert(name.to_ascii_lowercase(), hit.clone());
        }
        self.matched += 1;
    }

    fn hit(&self, name: &str) -> Option<&Hit> {
        self.hits.get(&name.to_ascii_lowercase())
    }

    /// True when the option appeared at all.
    pub fn has(&self, name: &str) -> bool {
        self.hit(name).is_some()
    }

    /// The value supplied for a value option, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.hit(name) {
            Some(Hit::Present(Some(v))) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn toggle(&self, name: &str) -> Toggle {
        match self.hit(name) {
            Some(Hit::Toggle(t)) => *t,
            _ => Toggle::Unset,
        }
    }

    /// Parse a value option as an integer; absent means `None`.
    pub fn int_value(&self, name: &str) -> Result<Option<i64>, DispatchError> {
        match self.value(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
                DispatchError::parse(format!("'{}' is not a valid number for option '{}'.", raw, name))
            }),
        }
    }

    /// Tokens that matched no option, in input order.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// True when at least one option matched.
    pub fn matched_any(&self) -> bool {
        self.matched > 0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn toks(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_set() -> OptionSet {
        OptionSet::new()
            .flag("?|help", "Show help information.")
            .required("c|count", "Count to a specified number.")
            .optional("echo", "Echo a value.")
            .flag("madlib", "Play a madlib.")
            .toggle("option1", "Toggle option1.")
    }

    #[test]
    fn tokenize_plain_and_quoted() {
        assert_eq!(tokenize("SAMPLE --count=3").unwrap(), toks(&["SAMPLE", "--count=3"]));
        assert_eq!(
            tokenize("  tell  \"two words\" x ").unwrap(),
            toks(&["tell", "two words", "x"])
        );
        assert_eq!(tokenize("say \"\"").unwrap(), toks(&["say", ""]));
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn tokenize_unterminated_quote() {
        let err = tokenize("say \"oops").unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentParse(_)));
    }

    #[test]
    fn required_value_forms() {
        let set = sample_set();
        let forms: [&[&str]; 4] = [&["--count=3"], &["--count:3"], &["-c", "3"], &["/COUNT=3"]];
        for form in forms {
            let parsed = set.parse(&toks(form)).unwrap();
            assert_eq!(parsed.value("count"), Some("3"), "form {:?}", form);
            assert_eq!(parsed.value("c"), Some("3"));
            assert_eq!(parsed.int_value("count").unwrap(), Some(3));
        }
    }

    #[test]
    fn required_value_missing() {
        let err = sample_set().parse(&toks(&["--count"])).unwrap_err();
        assert_eq!(
            err,
            DispatchError::parse("Missing required value for option '--count'.")
        );
    }

    #[test]
    fn int_value_rejects_text() {
        let parsed = sample_set().parse(&toks(&["--count=abc"])).unwrap();
        assert!(parsed.int_value("count").is_err());
    }

    #[test]
    fn optional_value() {
        let set = sample_set();
        let bare = set.parse(&toks(&["--echo"])).unwrap();
        assert!(bare.has("echo"));
        assert_eq!(bare.value("echo"), None);
        let valued = set.parse(&toks(&["--echo=hi"])).unwrap();
        assert_eq!(valued.value("echo"), Some("hi"));
    }

    #[test]
    fn toggles_are_three_valued() {
        let set = sample_set();
        assert_eq!(set.parse(&toks(&[])).unwrap().toggle("option1"), Toggle::Unset);
        assert_eq!(set.parse(&toks(&["--option1"])).unwrap().toggle("option1"), Toggle::On);
        assert_eq!(set.parse(&toks(&["--option1+"])).unwrap().toggle("option1"), Toggle::On);
        assert_eq!(set.parse(&toks(&["--option1-"])).unwrap().toggle("option1"), Toggle::Off);
    }

    #[test]
    fn flag_rejects_value() {
        assert!(sample_set().parse(&toks(&["--madlib=yes"])).is_err());
    }

    #[test]
    fn unknown_options_stay_positional() {
        let parsed = sample_set().parse(&toks(&["42", "--nope", "-", "x"])).unwrap();
        assert_eq!(parsed.positional(), &toks(&["42", "--nope", "-", "x"])[..]);
        assert!(!parsed.matched_any());
    }

    #[test]
    fn names_are_case_insensitive() {
        let parsed = sample_set().parse(&toks(&["--MADLIB", "-?"])).unwrap();
        assert!(parsed.has("madlib"));
        assert!(parsed.has("help"));
        assert!(parsed.matched_any());
    }

    #[test]
    fn rows_render_signatures() {
        let rows = sample_set().rows();
        assert_eq!(rows[0].0, "-?, --help");
        assert_eq!(rows[1].0, "-c, --count=VALUE");
        assert_eq!(rows[2].0, "--echo[=VALUE]");
        assert_eq!(rows[4].0, "--option1[+|-]");
    }
}

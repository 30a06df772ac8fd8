//! This crate implements a declarative command line option parser modelled
//! after the classic optparse API.  You register options up front, hand the
//! parser your command line, and get back a mapping of stored values plus
//! the leftover positional arguments.
//!
//! # Example
//!
//! Parsing happens via the [`OptionParser`] type:
//!
//! ```
//! use optparse::{Action, Error, OptionParser, Outcome};
//!
//! fn main() -> Result<(), Error> {
//!     let mut parser = OptionParser::new();
//!     parser.description("just an example");
//!     parser
//!         .add_option(&["-f", "--file"])?
//!         .dest("filename")
//!         .metavar("FILE")
//!         .help("write report to FILE");
//!     parser
//!         .add_option(&["-q", "--quiet"])?
//!         .action(Action::StoreFalse)
//!         .dest("verbose")
//!         .set_default("1")
//!         .help("don't print status messages to stdout");
//!
//!     match parser.parse_args(["-f", "report.txt"])? {
//!         Outcome::Done(parsed) => {
//!             assert_eq!(parsed.get("filename").as_str(), "report.txt");
//!             assert!(parsed.get("verbose").as_bool());
//!             assert!(parsed.args().is_empty());
//!         }
//!         Outcome::Help(text) | Outcome::Version(text) => print!("{}", text),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Here is what's happening:
//!
//! * [`OptionParser::add_option`] registers an option under one or more flag
//!   spellings (`-x` is a short flag, `--xxx` a long flag) and returns a
//!   mutable reference to the new [`Opt`] for chained configuration.
//! * [`OptionParser::parse_args`] scans the tokens left to right, matching
//!   flags against the registry and collecting everything else as leftover
//!   positional arguments.
//! * The [`Outcome`] distinguishes a completed parse from a triggered help
//!   or version option.  The parser never prints and never exits; rendered
//!   help text is handed back so the caller can decide what to do with it.
//!
//! # Behavior
//!
//! Long flags may be abbreviated to any unambiguous prefix (`--fi` finds
//! `--file` as long as no other flag starts with `fi`) and accept attached
//! values via `--file=out.txt`.  Short flags bundle (`-vq` is `-v -q`) and
//! value-taking short flags claim the rest of their token (`-fout.txt`).
//! A bare `--` ends option scanning; everything after it is leftover, even
//! tokens that start with a dash.  Options and positional arguments may be
//! freely mixed.
//!
//! # Limitations
//!
//! Typed access via [`Value`] is deliberately lenient: a stored string that
//! does not parse as the requested type yields that type's default value
//! instead of an error.  This preserves the classic optparse contract.
//! Likewise [`Values::is_set`] cannot distinguish an explicitly passed
//! value from a seeded default.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Index;
use std::path::Path;
use std::str::FromStr;

mod help;

/// Separator used when one dest stores more than one value token
/// (`append` actions and `nargs > 1`).  [`Value::as_list`] splits on it.
const VALUE_SEPARATOR: &str = ",";

pub struct Error {
    repr: Box<ErrorRepr>,
}

impl Error {
    fn new(kind: ErrorKind) -> Error {
        Error {
            repr: Box::new(ErrorRepr {
                kind,
                flag: None,
                value: None,
                candidates: Vec::new(),
                expected: 0,
            }),
        }
    }

    fn with_flag(mut self, flag: Flag) -> Error {
        self.repr.flag = Some(flag);
        self
    }

    fn with_value(mut self, value: impl Into<String>) -> Error {
        self.repr.value = Some(value.into());
        self
    }

    fn with_candidates<I>(mut self, candidates: I) -> Error
    where
        I: IntoIterator<Item = String>,
    {
        self.repr.candidates = candidates.into_iter().collect();
        self
    }

    fn with_expected(mut self, expected: usize) -> Error {
        self.repr.expected = expected;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.repr.kind
    }

    /// The flag spelling the error refers to, if any.
    pub fn flag(&self) -> Option<&Flag> {
        self.repr.flag.as_ref()
    }

    /// The offending value, if the error kind carries one.
    pub fn value(&self) -> Option<&str> {
        self.repr.value.as_deref()
    }

    /// Candidate flags for ambiguity errors, allowed values for choice errors.
    pub fn candidates(&self) -> &[String] {
        &self.repr.candidates
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind(), self.flag()) {
            (ErrorKind::UnrecognizedOption, Some(flag)) => {
                write!(f, "no such option: {}", flag)
            }
            (ErrorKind::UnrecognizedOption, None) => write!(f, "no such option"),
            (ErrorKind::AmbiguousOption, Some(flag)) => write!(
                f,
                "ambiguous option: {} ({}?)",
                flag,
                self.repr.candidates.join(", ")
            ),
            (ErrorKind::AmbiguousOption, None) => write!(f, "ambiguous option"),
            (ErrorKind::MissingArgument, Some(flag)) if self.repr.expected > 1 => {
                write!(
                    f,
                    "{} option requires {} arguments",
                    flag, self.repr.expected
                )
            }
            (ErrorKind::MissingArgument, Some(flag)) => {
                write!(f, "{} option requires an argument", flag)
            }
            (ErrorKind::MissingArgument, None) => write!(f, "missing argument"),
            (ErrorKind::UnexpectedArgument, Some(flag)) => {
                write!(f, "{} option does not take a value", flag)
            }
            (ErrorKind::UnexpectedArgument, None) => write!(f, "unexpected argument"),
            (ErrorKind::InvalidChoice, Some(flag)) => {
                let choices = self
                    .repr
                    .candidates
                    .iter()
                    .map(|choice| format!("'{}'", choice))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "option {}: invalid choice: '{}' (choose from {})",
                    flag,
                    self.value().unwrap_or_default(),
                    choices
                )
            }
            (ErrorKind::InvalidChoice, None) => write!(f, "invalid choice"),
            (ErrorKind::Configuration, Some(flag)) => {
                write!(f, "conflicting option string: {}", flag)
            }
            (ErrorKind::Configuration, None) => {
                write!(
                    f,
                    "invalid option string: '{}'",
                    self.value().unwrap_or_default()
                )
            }
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind())
            .field("flag", &self.flag())
            .field("value", &self.value())
            .finish()
    }
}

impl std::error::Error for Error {}

struct ErrorRepr {
    kind: ErrorKind,
    flag: Option<Flag>,
    value: Option<String>,
    candidates: Vec<String>,
    expected: usize,
}

/// Represents a parsing or registration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A flag character or string that is not in the registry.
    UnrecognizedOption,
    /// A long flag prefix that matches two or more registered flags.
    AmbiguousOption,
    /// A value-taking option with too few tokens left to consume.
    MissingArgument,
    /// A `--name=value` spelling for an option whose action takes no value.
    UnexpectedArgument,
    /// A value outside the option's configured choice set.
    InvalidChoice,
    /// A malformed or duplicate flag spelling at registration time.
    Configuration,
}

/// A flag spelling, as matched during scanning or declared at registration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// A single character flag (`-x`).
    Short(char),
    /// A multi character flag (`--xxx`).
    Long(String),
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Short(c) => write!(f, "-{}", c),
            Flag::Long(name) => write!(f, "--{}", name),
        }
    }
}

/// The behavior triggered when an option is matched.
///
/// `Store` and `Append` consume value tokens; all other actions take no
/// value and ignore any configured [`Opt::nargs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Store the value under the dest, overwriting any prior value.
    #[default]
    Store,
    /// Store the option's configured constant.
    StoreConst,
    /// Store `"1"`.
    StoreTrue,
    /// Store `"0"`.
    StoreFalse,
    /// Concatenate the value onto the stored value, preserving order.
    Append,
    /// Concatenate the option's configured constant onto the stored value.
    AppendConst,
    /// Increment an integer counter stored in its string form.
    Count,
    /// Terminate scanning and hand rendered help text back to the caller.
    Help,
    /// Terminate scanning and hand the rendered version string back.
    Version,
}

impl Action {
    /// Whether this action consumes value tokens when triggered.
    pub fn takes_value(self) -> bool {
        matches!(self, Action::Store | Action::Append)
    }
}

/// The declared type of an option's value.
///
/// Only `Choice` is validated at store time; the numeric types document
/// intent and are converted lazily (and leniently) through [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Str,
    Int,
    Long,
    Float,
    Choice,
}

/// A registered option.
///
/// Created through [`OptionParser::add_option`] and configured through the
/// chained setters, which are plain field mutations with no cross-option
/// validation.
#[derive(Debug, Clone)]
pub struct Opt {
    pub(crate) short_flags: Vec<char>,
    pub(crate) long_flags: Vec<String>,
    pub(crate) action: Action,
    pub(crate) value_type: ValueType,
    pub(crate) dest: Option<String>,
    pub(crate) nargs: usize,
    pub(crate) default: Option<String>,
    pub(crate) constant: Option<String>,
    pub(crate) choices: Vec<String>,
    pub(crate) help: String,
    pub(crate) metavar: Option<String>,
}

impl Opt {
    fn with_flags(short_flags: Vec<char>, long_flags: Vec<String>) -> Opt {
        Opt {
            short_flags,
            long_flags,
            action: Action::Store,
            value_type: ValueType::Str,
            dest: None,
            nargs: 1,
            default: None,
            constant: None,
            choices: Vec::new(),
            help: String::new(),
            metavar: None,
        }
    }

    pub fn action(&mut self, action: Action) -> &mut Self {
        self.action = action;
        self
    }

    pub fn value_type(&mut self, value_type: ValueType) -> &mut Self {
        self.value_type = value_type;
        self
    }

    /// Sets the key under which the value is stored.
    ///
    /// When unset, the dest is derived from the first long flag, or the
    /// first short flag if there is no long flag.
    pub fn dest(&mut self, dest: impl Into<String>) -> &mut Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn set_default(&mut self, value: impl Into<String>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the number of value tokens consumed when the option matches.
    ///
    /// Only meaningful for value-taking actions; everything else consumes
    /// zero tokens regardless.
    pub fn nargs(&mut self, nargs: usize) -> &mut Self {
        self.nargs = nargs;
        self
    }

    /// Sets the constant stored by the `StoreConst` and `AppendConst` actions.
    pub fn set_const(&mut self, value: impl Into<String>) -> &mut Self {
        self.constant = Some(value.into());
        self
    }

    /// Restricts the accepted values and forces the type to [`ValueType::Choice`].
    pub fn choices<I, S>(&mut self, choices: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self.value_type = ValueType::Choice;
        self
    }

    pub fn help(&mut self, help: impl Into<String>) -> &mut Self {
        self.help = help.into();
        self
    }

    pub fn metavar(&mut self, metavar: impl Into<String>) -> &mut Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Whether this option consumes value tokens when matched.
    pub fn takes_value(&self) -> bool {
        self.action.takes_value()
    }

    /// The key this option stores under.
    pub fn dest_key(&self) -> String {
        if let Some(dest) = &self.dest {
            dest.clone()
        } else if let Some(name) = self.long_flags.first() {
            name.clone()
        } else if let Some(&c) = self.short_flags.first() {
            c.to_string()
        } else {
            String::new()
        }
    }

    fn effective_nargs(&self) -> usize {
        self.nargs.max(1)
    }
}

/// A lazy typed view of one stored value.
///
/// Conversions never fail.  A value that is unset or does not parse as the
/// requested type yields the type's default, matching the lenient optparse
/// contract this crate preserves.
#[derive(Debug, Clone, Copy)]
pub struct Value<'a> {
    raw: Option<&'a str>,
}

impl<'a> Value<'a> {
    /// Whether a value is stored at all.
    pub fn is_set(self) -> bool {
        self.raw.is_some()
    }

    /// The stored string, or `""` when unset.
    pub fn as_str(self) -> &'a str {
        self.raw.unwrap_or("")
    }

    /// Parses with [`FromStr`], falling back to the type's default.
    ///
    /// ```
    /// # use optparse::Values;
    /// let values = Values::default();
    /// assert_eq!(values.get("missing").parse::<i32>(), 0);
    /// ```
    pub fn parse<T>(self) -> T
    where
        T: FromStr + Default,
    {
        self.as_str().parse().unwrap_or_default()
    }

    pub fn as_int(self) -> i32 {
        self.parse()
    }

    pub fn as_long(self) -> i64 {
        self.parse()
    }

    pub fn as_float(self) -> f64 {
        self.parse()
    }

    /// `true` for `"1"` (the `StoreTrue` literal) and `"true"`, else `false`.
    pub fn as_bool(self) -> bool {
        let raw = self.as_str();
        raw == "1" || raw.parse().unwrap_or(false)
    }

    /// Splits an appended or multi-token value back into its parts.
    pub fn as_list(self) -> Vec<&'a str> {
        match self.raw {
            Some(raw) if !raw.is_empty() => raw.split(VALUE_SEPARATOR).collect(),
            _ => Vec::new(),
        }
    }
}

/// The dest to value mapping produced by a parse.
///
/// Seeded with registered defaults before scanning, then overwritten as
/// options match.  Indexing with an unset dest reads as `""`.
#[derive(Debug, Clone, Default)]
pub struct Values {
    map: BTreeMap<String, String>,
}

impl Values {
    /// Whether the dest has a value, from a match or a seeded default.
    pub fn is_set(&self, dest: &str) -> bool {
        self.map.contains_key(dest)
    }

    /// The stored string, or `None` when unset.
    pub fn raw(&self, dest: &str) -> Option<&str> {
        self.map.get(dest).map(String::as_str)
    }

    /// A typed view of the stored value.
    pub fn get(&self, dest: &str) -> Value<'_> {
        Value {
            raw: self.raw(dest),
        }
    }

    fn set(&mut self, dest: String, value: impl Into<String>) {
        self.map.insert(dest, value.into());
    }

    fn append(&mut self, dest: String, value: &str) {
        match self.map.get_mut(&dest) {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(VALUE_SEPARATOR);
                existing.push_str(value);
            }
            _ => {
                self.map.insert(dest, value.to_string());
            }
        }
    }
}

impl Index<&str> for Values {
    type Output = str;

    fn index(&self, dest: &str) -> &str {
        self.raw(dest).unwrap_or("")
    }
}

/// The result of a completed parse: stored values plus leftover positionals.
///
/// Owned and independent of the parser that produced it.
#[derive(Debug, Clone)]
pub struct Parsed {
    values: Values,
    leftover: Vec<String>,
}

impl Parsed {
    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn into_values(self) -> Values {
        self.values
    }

    /// The leftover positional tokens, in their original relative order.
    pub fn args(&self) -> &[String] {
        &self.leftover
    }

    pub fn get(&self, dest: &str) -> Value<'_> {
        self.values.get(dest)
    }

    pub fn is_set(&self, dest: &str) -> bool {
        self.values.is_set(dest)
    }
}

/// What a parse produced.
///
/// Help and version options terminate scanning and surface here with their
/// rendered text instead of printing or exiting, so embedding callers can
/// choose their own behavior.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Scanning ran to the end of the tokens.
    Done(Parsed),
    /// A help option was matched; carries the rendered help text.
    Help(String),
    /// A version option was matched; carries the rendered version string.
    Version(String),
}

impl Outcome {
    /// The parse result, or `None` if help or version short-circuited.
    pub fn done(self) -> Option<Parsed> {
        match self {
            Outcome::Done(parsed) => Some(parsed),
            Outcome::Help(_) | Outcome::Version(_) => None,
        }
    }
}

/// The two scan states.  The transition on a bare `--` is irreversible.
enum ScanState {
    Scanning,
    CollectingLeftover,
}

/// A declarative command line option parser.
///
/// Owns the registered options and two lookup indexes (short flag character
/// and long flag string), kept in sync on every registration.  Parsing
/// never mutates the registry and returns an owned [`Outcome`].  For basic
/// instructions consult the crate documentation.
pub struct OptionParser {
    pub(crate) usage: String,
    pub(crate) version: String,
    pub(crate) description: String,
    pub(crate) prog: String,
    pub(crate) epilog: String,
    add_help_option: bool,
    add_version_option: bool,
    pub(crate) opts: Vec<Opt>,
    short_index: HashMap<char, usize>,
    long_index: BTreeMap<String, usize>,
    defaults: BTreeMap<String, String>,
}

impl fmt::Debug for OptionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionParser")
            .field("prog", &self.prog)
            .field("options", &self.opts.len())
            .finish()
    }
}

impl Default for OptionParser {
    fn default() -> Self {
        OptionParser::new()
    }
}

impl OptionParser {
    pub fn new() -> OptionParser {
        OptionParser {
            usage: "%prog [options]".to_string(),
            version: String::new(),
            description: String::new(),
            prog: String::new(),
            epilog: String::new(),
            add_help_option: true,
            add_version_option: true,
            opts: Vec::new(),
            short_index: HashMap::new(),
            long_index: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Sets the usage template.  `%prog` expands to the program name.
    pub fn usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = usage.into();
        self
    }

    /// Sets the version string and enables the automatic `--version` option.
    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = version.into();
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Sets the program name used in usage, version and error text.
    ///
    /// [`parse_cmdline`](Self::parse_cmdline) derives it from the first
    /// argument when it was not set explicitly.
    pub fn prog(&mut self, prog: impl Into<String>) -> &mut Self {
        self.prog = prog.into();
        self
    }

    pub fn epilog(&mut self, epilog: impl Into<String>) -> &mut Self {
        self.epilog = epilog.into();
        self
    }

    /// Controls the automatic `-h`/`--help` option.  Enabled by default.
    pub fn add_help_option(&mut self, yes: bool) -> &mut Self {
        self.add_help_option = yes;
        self
    }

    /// Controls the automatic `--version` option.  Enabled by default,
    /// though it only appears once a version string is set.
    pub fn add_version_option(&mut self, yes: bool) -> &mut Self {
        self.add_version_option = yes;
        self
    }

    /// Seeds a default value, overriding any option-level default for the dest.
    pub fn set_defaults(&mut self, dest: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.defaults.insert(dest.into(), value.into());
        self
    }

    /// Registers an option under the given flag spellings.
    ///
    /// Each spelling is classified by its leading dashes: `-x` is a short
    /// flag, `--xxx` a long flag.  Conventionally an option gets one short
    /// and one long spelling, but one to three are accepted.  Returns a
    /// mutable reference to the new option for chained configuration.
    ///
    /// Fails with [`ErrorKind::Configuration`] when a spelling is malformed
    /// or already registered.
    pub fn add_option(&mut self, flags: &[&str]) -> Result<&mut Opt, Error> {
        if flags.is_empty() {
            return Err(Error::new(ErrorKind::Configuration).with_value(""));
        }
        let mut short_flags = Vec::new();
        let mut long_flags = Vec::new();
        for &spelling in flags {
            if let Some(name) = spelling.strip_prefix("--") {
                if name.is_empty() {
                    return Err(Error::new(ErrorKind::Configuration).with_value(spelling));
                }
                if self.long_index.contains_key(name) || long_flags.iter().any(|f| f == name) {
                    return Err(Error::new(ErrorKind::Configuration)
                        .with_flag(Flag::Long(name.to_string())));
                }
                long_flags.push(name.to_string());
            } else if let Some(rest) = spelling.strip_prefix('-') {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        if self.short_index.contains_key(&c) || short_flags.contains(&c) {
                            return Err(
                                Error::new(ErrorKind::Configuration).with_flag(Flag::Short(c))
                            );
                        }
                        short_flags.push(c);
                    }
                    _ => return Err(Error::new(ErrorKind::Configuration).with_value(spelling)),
                }
            } else {
                return Err(Error::new(ErrorKind::Configuration).with_value(spelling));
            }
        }
        let index = self.register(Opt::with_flags(short_flags, long_flags));
        Ok(&mut self.opts[index])
    }

    /// Inserts the option and republishes both lookup indexes.
    fn register(&mut self, opt: Opt) -> usize {
        let index = self.opts.len();
        for &c in &opt.short_flags {
            self.short_index.insert(c, index);
        }
        for name in &opt.long_flags {
            self.long_index.insert(name.clone(), index);
        }
        self.opts.push(opt);
        index
    }

    /// Registers the automatic help and version options, skipping any
    /// spelling the caller already claimed.
    fn ensure_builtin_opts(&mut self) {
        if self.add_help_option && !self.long_index.contains_key("help") {
            let short = if self.short_index.contains_key(&'h') {
                Vec::new()
            } else {
                vec!['h']
            };
            let mut opt = Opt::with_flags(short, vec!["help".to_string()]);
            opt.action = Action::Help;
            opt.help = "show this help message and exit".to_string();
            self.register(opt);
        }
        if self.add_version_option
            && !self.version.is_empty()
            && !self.long_index.contains_key("version")
        {
            let mut opt = Opt::with_flags(Vec::new(), vec!["version".to_string()]);
            opt.action = Action::Version;
            opt.help = "show program's version number and exit".to_string();
            self.register(opt);
        }
    }

    /// Parses the process command line from the current environment.
    pub fn parse_env(&mut self) -> Result<Outcome, Error> {
        self.parse_cmdline(std::env::args())
    }

    /// Parses a full command line.
    ///
    /// The first element is the program name; it is excluded from scanning
    /// and, unless [`prog`](Self::prog) was set, its file name portion
    /// becomes the program name used in rendered text.
    pub fn parse_cmdline<I, S>(&mut self, argv: I) -> Result<Outcome, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        if let Some(first) = argv.next() {
            if self.prog.is_empty() {
                self.prog = program_name(&first);
            }
        }
        self.parse_args(argv)
    }

    /// Parses a pre-split token sequence (no program name).
    pub fn parse_args<I, S>(&mut self, args: I) -> Result<Outcome, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_builtin_opts();
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        self.parse_tokens(&tokens)
    }

    fn parse_tokens(&self, tokens: &[String]) -> Result<Outcome, Error> {
        let mut values = Values::default();
        for opt in &self.opts {
            if let Some(default) = &opt.default {
                values.set(opt.dest_key(), default.clone());
            }
        }
        for (dest, value) in &self.defaults {
            values.set(dest.clone(), value.clone());
        }

        let mut leftover = Vec::new();
        let mut state = ScanState::Scanning;
        let mut cursor = 0;
        while cursor < tokens.len() {
            let token = &tokens[cursor];
            cursor += 1;
            if let ScanState::CollectingLeftover = state {
                leftover.push(token.clone());
            } else if token == "--" {
                state = ScanState::CollectingLeftover;
            } else if token.len() > 2 && token.starts_with("--") {
                if let Some(outcome) =
                    self.handle_long_opt(token, tokens, &mut cursor, &mut values)?
                {
                    return Ok(outcome);
                }
            } else if token.len() > 1 && token.starts_with('-') {
                if let Some(outcome) =
                    self.handle_short_opts(token, tokens, &mut cursor, &mut values)?
                {
                    return Ok(outcome);
                }
            } else {
                leftover.push(token.clone());
            }
        }

        Ok(Outcome::Done(Parsed { values, leftover }))
    }

    fn handle_long_opt(
        &self,
        token: &str,
        tokens: &[String],
        cursor: &mut usize,
        values: &mut Values,
    ) -> Result<Option<Outcome>, Error> {
        let body = &token[2..];
        let (name, attached) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let opt = &self.opts[self.lookup_long_opt(name)?];
        let flag = Flag::Long(name.to_string());
        if opt.takes_value() {
            let value = self.collect_values(opt, &flag, attached, tokens, cursor)?;
            self.process_value(opt, &flag, &value, values)?;
            Ok(None)
        } else if let Some(value) = attached {
            Err(Error::new(ErrorKind::UnexpectedArgument)
                .with_flag(flag)
                .with_value(value))
        } else {
            Ok(self.process_flag(opt, values))
        }
    }

    fn handle_short_opts(
        &self,
        token: &str,
        tokens: &[String],
        cursor: &mut usize,
        values: &mut Values,
    ) -> Result<Option<Outcome>, Error> {
        let cluster = &token[1..];
        for (pos, c) in cluster.char_indices() {
            let index = *self
                .short_index
                .get(&c)
                .ok_or_else(|| Error::new(ErrorKind::UnrecognizedOption).with_flag(Flag::Short(c)))?;
            let opt = &self.opts[index];
            let flag = Flag::Short(c);
            if opt.takes_value() {
                // The value claims the rest of the token.
                let rest = &cluster[pos + c.len_utf8()..];
                let attached = if rest.is_empty() { None } else { Some(rest) };
                let value = self.collect_values(opt, &flag, attached, tokens, cursor)?;
                self.process_value(opt, &flag, &value, values)?;
                return Ok(None);
            }
            if let Some(outcome) = self.process_flag(opt, values) {
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    /// Resolves a long flag name, exact match first, then as an
    /// unambiguous prefix of a registered flag.
    fn lookup_long_opt(&self, name: &str) -> Result<usize, Error> {
        if name.is_empty() {
            return Err(
                Error::new(ErrorKind::UnrecognizedOption).with_flag(Flag::Long(String::new()))
            );
        }
        if let Some(&index) = self.long_index.get(name) {
            return Ok(index);
        }
        let matches: Vec<(&String, &usize)> = self
            .long_index
            .range(name.to_string()..)
            .take_while(|(flag, _)| flag.starts_with(name))
            .collect();
        match matches.as_slice() {
            [] => Err(
                Error::new(ErrorKind::UnrecognizedOption).with_flag(Flag::Long(name.to_string()))
            ),
            [(_, &index)] => Ok(index),
            _ => Err(Error::new(ErrorKind::AmbiguousOption)
                .with_flag(Flag::Long(name.to_string()))
                .with_candidates(matches.iter().map(|(flag, _)| format!("--{}", flag)))),
        }
    }

    /// Gathers the option's `nargs` value tokens, starting with an attached
    /// `=value` or token remainder when present.
    fn collect_values(
        &self,
        opt: &Opt,
        flag: &Flag,
        attached: Option<&str>,
        tokens: &[String],
        cursor: &mut usize,
    ) -> Result<String, Error> {
        let needed = opt.effective_nargs();
        let mut parts = Vec::with_capacity(needed);
        if let Some(value) = attached {
            parts.push(value.to_string());
        }
        while parts.len() < needed {
            if *cursor >= tokens.len() {
                return Err(Error::new(ErrorKind::MissingArgument)
                    .with_flag(flag.clone())
                    .with_expected(needed));
            }
            parts.push(tokens[*cursor].clone());
            *cursor += 1;
        }
        Ok(parts.join(VALUE_SEPARATOR))
    }

    fn process_value(
        &self,
        opt: &Opt,
        flag: &Flag,
        value: &str,
        values: &mut Values,
    ) -> Result<(), Error> {
        if opt.value_type == ValueType::Choice && !opt.choices.iter().any(|c| c == value) {
            return Err(Error::new(ErrorKind::InvalidChoice)
                .with_flag(flag.clone())
                .with_value(value)
                .with_candidates(opt.choices.iter().cloned()));
        }
        match opt.action {
            Action::Store => values.set(opt.dest_key(), value),
            Action::Append => values.append(opt.dest_key(), value),
            // Every other action goes through process_flag.
            _ => {}
        }
        Ok(())
    }

    fn process_flag(&self, opt: &Opt, values: &mut Values) -> Option<Outcome> {
        match opt.action {
            Action::StoreTrue => values.set(opt.dest_key(), "1"),
            Action::StoreFalse => values.set(opt.dest_key(), "0"),
            Action::StoreConst => {
                values.set(opt.dest_key(), opt.constant.clone().unwrap_or_default())
            }
            Action::AppendConst => {
                values.append(opt.dest_key(), opt.constant.as_deref().unwrap_or_default())
            }
            Action::Count => {
                let dest = opt.dest_key();
                let count: u64 = values.raw(&dest).and_then(|v| v.parse().ok()).unwrap_or(0);
                values.set(dest, (count + 1).to_string());
            }
            Action::Help => return Some(Outcome::Help(self.format_help())),
            Action::Version => return Some(Outcome::Version(self.format_version())),
            Action::Store | Action::Append => {}
        }
        None
    }
}

/// The file name portion of the first command line argument.
fn program_name(argv0: &str) -> String {
    Path::new(argv0)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

//! CLI command implementations
//!
//! Every command writes its report to the given writer; logging goes to
//! stderr through the `log` facade.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::browse::{cache_file, BrowseSession, Shell};
use crate::document::{Document, DocumentError, HashCheck, JsonSerializer, Serializer, INFO_SECTION};
use crate::hash::HashAlgorithm;
use crate::index::{discover, DocumentIndex, SerializedLoader};
use crate::observability::Logger;
use crate::schema::DirectoryResolver;

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};

/// File name used by `new` when none is given
pub const DEFAULT_FILENAME: &str = "data.hods.json";

/// Collaborators shared by all commands
pub struct Context {
    /// Validated configuration
    pub config: Config,
    /// Schemas from `config.schema_dir`
    pub resolver: DirectoryResolver,
    /// Document format
    pub serializer: JsonSerializer,
    required: Vec<HashAlgorithm>,
}

impl Context {
    /// Builds the context for a validated configuration
    pub fn new(config: Config) -> CliResult<Self> {
        let required = config.algorithms()?;
        Ok(Self {
            resolver: DirectoryResolver::new(config.schema_dir.clone()),
            serializer: JsonSerializer,
            config,
            required,
        })
    }

    fn verify(&self) -> HashCheck {
        HashCheck::verify().with_required(self.required.clone())
    }

    fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        Document::load(path, &self.serializer, &self.resolver)
    }
}

/// Installs the stderr logger. `HODS_DEBUG` enables debug events.
pub fn init_logging() {
    let default_level = if std::env::var_os("HODS_DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .try_init();
}

/// Parse arguments and run the chosen command
pub fn run() -> CliResult<()> {
    init_logging();
    run_command(Cli::parse_args())
}

/// Run a parsed command line
pub fn run_command(cli: Cli) -> CliResult<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    let ctx = Context::new(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Check { recursive, files } => check(&ctx, &files, recursive, &mut out),
        Command::Rehash {
            sections,
            sections_all,
            files,
        } => {
            let selection = if sections_all {
                SectionSelection::All
            } else if sections.is_empty() {
                SectionSelection::Recorded
            } else {
                SectionSelection::Named(sections)
            };
            rehash(&ctx, &files, &selection, &mut out)
        }
        Command::New { files } => new(&ctx, &files, &mut out),
        Command::Browse { directory } => {
            let target = directory.unwrap_or_else(|| PathBuf::from("."));
            let stdin = io::stdin();
            browse(&ctx, &target, stdin.lock(), &mut out)
        }
    }
}

// ==================
// check
// ==================

/// Outcome of checking one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Valid with matching hashes
    Ok,
    /// Schema violation or unresolvable schema
    SchemaError,
    /// File does not exist
    FileNotFound,
    /// Unreadable or malformed document
    ParseError,
    /// Recorded digest differs
    HashError,
}

impl CheckStatus {
    /// Whether the file passed
    pub fn is_ok(&self) -> bool {
        *self == CheckStatus::Ok
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CheckStatus::Ok => "OK",
            CheckStatus::SchemaError => "SCHEMA ERROR",
            CheckStatus::FileNotFound => "FILE NOT FOUND",
            CheckStatus::ParseError => "PARSE ERROR",
            CheckStatus::HashError => "HASH ERROR",
        };
        write!(f, "{}", text)
    }
}

/// Loads, validates and verifies hashes of one file
pub fn check_file(ctx: &Context, path: &Path) -> CheckStatus {
    let mut doc = match ctx.load(path) {
        Ok(doc) => doc,
        Err(DocumentError::Validation(_)) => return CheckStatus::SchemaError,
        Err(DocumentError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            return CheckStatus::FileNotFound
        }
        Err(_) => return CheckStatus::ParseError,
    };
    match doc.validate_hashes(&ctx.verify()) {
        Ok(_) => CheckStatus::Ok,
        Err(DocumentError::Validation(_)) => CheckStatus::SchemaError,
        Err(_) => CheckStatus::HashError,
    }
}

/// `hods check`: prints one status line per file, fails if any file failed
pub fn check(ctx: &Context, files: &[PathBuf], recursive: bool, out: &mut dyn Write) -> CliResult<()> {
    let files = candidate_files(ctx, files, recursive)?;
    let mut failed = 0;
    for path in &files {
        let status = check_file(ctx, path);
        writeln!(out, "Checking {}: {}", path.display(), status)?;
        if !status.is_ok() {
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(CliError::check_failed(failed, files.len()));
    }
    Ok(())
}

// ==================
// rehash
// ==================

/// Which sections `rehash` covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionSelection {
    /// Sections that already carry a hash record
    Recorded,
    /// The named sections
    Named(Vec<String>),
    /// Every top-level section except `info`
    All,
}

/// Outcome of rehashing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RehashOutcome {
    /// All selected hashes already matched
    Unchanged,
    /// Hashes were rewritten and the file saved
    Updated,
}

/// Verifies a file's hashes and rewrites them if stale or missing.
pub fn rehash_file(ctx: &Context, path: &Path, selection: &SectionSelection) -> CliResult<RehashOutcome> {
    let mut doc = ctx.load(path)?;
    let sections: Vec<String> = match selection {
        SectionSelection::Recorded => Vec::new(),
        SectionSelection::Named(names) => names.clone(),
        SectionSelection::All => doc
            .tree()
            .keys(doc.tree().root())?
            .into_iter()
            .filter(|key| *key != INFO_SECTION)
            .map(str::to_string)
            .collect(),
    };

    let verify = ctx.verify().with_sections(sections.clone());
    let stale = match doc.validate_hashes(&verify) {
        Ok(_) => false,
        Err(DocumentError::HashMismatch { .. }) => true,
        Err(e) => return Err(e.into()),
    };
    let mut missing = false;
    for section in &sections {
        missing |= doc.hash_record(section)?.is_none();
    }
    if !stale && !missing {
        return Ok(RehashOutcome::Unchanged);
    }

    let update = HashCheck::update()
        .with_sections(sections)
        .with_required(ctx.required.clone());
    doc.validate_hashes(&update)?;
    doc.write(None, &ctx.serializer, &ctx.config.backup_suffix)?;
    Ok(RehashOutcome::Updated)
}

/// `hods rehash`
pub fn rehash(ctx: &Context, files: &[PathBuf], selection: &SectionSelection, out: &mut dyn Write) -> CliResult<()> {
    let files = candidate_files(ctx, files, false)?;
    for path in &files {
        match rehash_file(ctx, path, selection)? {
            RehashOutcome::Unchanged => writeln!(out, "No changes required for: {}", path.display())?,
            RehashOutcome::Updated => writeln!(out, "Data hashes updated for: {}", path.display())?,
        }
    }
    Ok(())
}

// ==================
// new
// ==================

/// Creates an empty document with a `data` section and its hashes recorded.
pub fn new_document(ctx: &Context, path: &Path) -> CliResult<()> {
    let mut doc = Document::from_payload(json!({}))?;
    let sections: Vec<String> = doc.sections().into_iter().map(str::to_string).collect();
    doc.validate_hashes(
        &HashCheck::update()
            .with_sections(sections)
            .with_required(ctx.required.clone()),
    )?;
    doc.write(Some(path), &ctx.serializer, &ctx.config.backup_suffix)?;
    Ok(())
}

/// `hods new`
pub fn new(ctx: &Context, files: &[PathBuf], out: &mut dyn Write) -> CliResult<()> {
    let default = [PathBuf::from(DEFAULT_FILENAME)];
    let files = if files.is_empty() { &default[..] } else { files };
    for path in files {
        new_document(ctx, path)?;
        writeln!(out, "Created {}", path.display())?;
    }
    Ok(())
}

// ==================
// browse
// ==================

/// `hods browse`: opens the target's cache and runs the shell on `input`.
pub fn browse<R: BufRead>(ctx: &Context, target: &Path, input: R, out: &mut dyn Write) -> CliResult<()> {
    let cache = cache_file(ctx.config.cache_dir.as_deref(), target)?;
    let cache_str = cache.display().to_string();
    let target_str = target.display().to_string();
    Logger::info(
        "BROWSE_START",
        &[("cache", cache_str.as_str()), ("target", target_str.as_str())],
    );

    let index = DocumentIndex::open(&cache)?;
    let loader = SerializedLoader::new(&ctx.serializer, &ctx.resolver);
    let mut session = BrowseSession::open(index, &loader, target, ctx.config.recursive)?;
    Shell::new(&mut session, input, out).run()?;
    Ok(())
}

fn candidate_files(ctx: &Context, files: &[PathBuf], recursive: bool) -> CliResult<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files.to_vec());
    }
    Ok(discover(Path::new("."), recursive, |p| ctx.serializer.supports(p))?)
}

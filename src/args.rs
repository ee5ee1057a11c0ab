//! These structs provide the CLI interface for the duckle CLI.

use crate::config::DEFAULT_REMOTE_URL;
use crate::model::{SortKey, TransactionId};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// duckle: A command-line tool for categorizing bank transactions.
///
/// Transactions are parsed from uploaded bank statements and held by the statement server. This
/// program lists them in any order you like and sets their categories. A category change shows up
/// right away and is undone if the server does not accept it.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. Pass --duckle-home if you do not want your data
    /// directory at $HOME/duckle, and --remote-url if the statement server is not running locally
    /// with its default settings.
    Init(InitArgs),
    /// List transactions in display order.
    List(ListArgs),
    /// Set the category of a transaction.
    Categorize(CategorizeArgs),
    /// List the categories that can be assigned to transactions.
    Categories,
    /// Add a category that can be assigned to transactions.
    AddCategory(AddCategoryArgs),
    /// Upload a bank statement for the statement server to import.
    Upload(UploadArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where duckle configuration is held. Defaults to ~/duckle
    #[arg(long, env = "DUCKLE_HOME", default_value_t = default_duckle_home())]
    duckle_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, duckle_home: PathBuf) -> Self {
        Self {
            log_level,
            duckle_home: duckle_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn duckle_home(&self) -> &DisplayPath {
        &self.duckle_home
    }
}

/// (Not shown): Args for the `duckle init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the statement server's API.
    #[arg(long, default_value = DEFAULT_REMOTE_URL)]
    remote_url: String,
}

impl InitArgs {
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
        }
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }
}

/// (Not shown): Args for the `duckle list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// A column to sort by. Repeat to click through columns in order: giving the same column twice
    /// in a row sorts it descending. Transactions are sorted by date when this is omitted.
    #[arg(long, value_enum)]
    sort: Vec<SortKey>,
}

impl ListArgs {
    pub fn new(sort: Vec<SortKey>) -> Self {
        Self { sort }
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }
}

/// (Not shown): Args for the `duckle categorize` command.
#[derive(Debug, Parser, Clone)]
pub struct CategorizeArgs {
    /// The id of the transaction.
    id: TransactionId,

    /// The category, e.g. "Grocery", or a category and subcategory, e.g.
    /// "Home -> Home Improvement".
    category: String,
}

impl CategorizeArgs {
    pub fn new(id: TransactionId, category: impl Into<String>) -> Self {
        Self {
            id,
            category: category.into(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// (Not shown): Args for the `duckle add-category` command.
#[derive(Debug, Parser, Clone)]
pub struct AddCategoryArgs {
    /// The name of the new category. A subcategory can be given as "Category -> Subcategory".
    name: String,
}

impl AddCategoryArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// (Not shown): Args for the `duckle upload` command.
#[derive(Debug, Parser, Clone)]
pub struct UploadArgs {
    /// The path to a PDF bank statement.
    path: PathBuf,
}

impl UploadArgs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_duckle_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("duckle"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --duckle-home or DUCKLE_HOME instead of relying on the default \
                duckle home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("duckle")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

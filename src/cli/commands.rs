use clap::Subcommand;

use super::config::ConfigArgs;
use super::interact::{ClickArgs, SelectArgs, TypeArgs};

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Click the first selector that resolves in the page or any frame
    Click(ClickArgs),

    /// Replace the contents of a field
    Type(TypeArgs),

    /// Pick an item from an open dropdown list by its text
    Select(SelectArgs),

    /// Inspect Frameweave configuration
    Config(ConfigArgs),
}

//! `vcs prepare|save|status`, thin wrappers over [`crate::vcs`].

use crate::config::GitSpec;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum VcsCommand {
    /// Initialize the configs directory as a git repository and wire up `origin`.
    Prepare,

    /// Commit, tag, and push every change under the configs directory.
    Save,

    /// Print whether the configs directory is a repo, its branch, and cleanliness.
    Status,
}

pub fn prepare(dir: &std::path::Path, spec: &GitSpec) -> anyhow::Result<()> {
    crate::vcs::prepare(dir, spec)
}

pub fn save(dir: &std::path::Path, spec: &GitSpec) -> anyhow::Result<()> {
    match crate::vcs::save(dir, spec)? {
        Some(tag) => println!("saved and pushed as {tag}"),
        None => println!("nothing to save; working tree is clean"),
    }
    Ok(())
}

pub fn status(dir: &std::path::Path) -> anyhow::Result<()> {
    let status = crate::vcs::status(dir)?;
    if !status.is_repo {
        println!("not a git repository");
        return Ok(());
    }
    println!(
        "branch={} clean={}",
        status.branch.as_deref().unwrap_or("<detached>"),
        status.clean
    );
    Ok(())
}

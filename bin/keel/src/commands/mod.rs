pub(crate) mod config;
pub(crate) mod daemon;
pub(crate) mod init;
pub(crate) mod swarm_key;

use std::{path::PathBuf, sync::Arc};

pub(crate) use config::ConfigCommand;
pub(crate) use daemon::DaemonArgs;
pub(crate) use init::InitArgs;
use keel_node_core::{Node, NodeBuilder};
use keel_repo::FsRepo;
pub(crate) use swarm_key::SwarmKeyCommand;

fn fs_node(path: PathBuf) -> NodeBuilder<FsRepo> {
    NodeBuilder::new(Arc::new(FsRepo::new(path)))
}

fn build(path: PathBuf) -> Node<FsRepo> {
    fs_node(path).build()
}

//! Process configuration (component C10, §3/§6 of SPEC_FULL.md): a storage
//! root (required) and a listen address (optional), loaded with `clap`'s
//! `derive` + `env` features so every flag doubles as an environment
//! variable, the same flag/env pairing style used elsewhere in the retrieved
//! pack.

use std::path::PathBuf;

use clap::Parser;

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Parser)]
#[command(name = "wopi-host", about = "A WOPI host implementing the request dispatcher and lock/session coordinator")]
pub struct Config {
    /// Directory on local disk under which every hosted file lives, flat.
    #[arg(long, env = "WOPI_STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// Address the HTTP listener binds to.
    #[arg(long, env = "WOPI_LISTEN_ADDR", default_value_t = default_listen_addr())]
    pub listen: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config::parse()
    }
}

//! `reqmux trust` – show which CA bundle requests will use.

use anyhow::Result;
use reqmux::config::ReqmuxConfig;
use reqmux::context::{derive_verify_peer, trust};

pub fn run_trust(cfg: &ReqmuxConfig) -> Result<()> {
    for candidate in trust::candidate_paths(&cfg.trust) {
        let mark = if candidate.exists() { "found" } else { "missing" };
        println!("candidate  {:<8} {}", mark, candidate.display());
    }
    let bundle = trust::discover(&cfg.trust);
    match &bundle {
        Some(path) => println!("bundle     {}", path.display()),
        None => println!("bundle     (none)"),
    }
    let verify = derive_verify_peer(bundle.as_deref(), cfg.http.verify_peer);
    println!("verify     {}", if verify { "on" } else { "off" });
    Ok(())
}

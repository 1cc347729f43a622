use log::LevelFilter;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

pub mod candidate;
pub mod chain;
pub mod config;
pub mod gas;
pub mod oracle;
pub mod orchestrator;
pub mod payload;
pub mod sampler;
pub mod submitter;

#[cfg(test)]
pub(crate) mod testing;

#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub trait EncodeHex {
    fn hex(&self) -> String;
}

impl<A> EncodeHex for A
where
    A: AsRef<[u8]>,
{
    fn hex(&self) -> String {
        hex::encode(self)
    }
}

/// Logs go to stdout, and are mirrored to `file` when given.
pub fn set_up_logging(level: LevelFilter, file: Option<&Path>) -> anyhow::Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout());
    if let Some(file) = file {
        dispatch = dispatch.chain(fern::log_file(file)?);
    }
    dispatch.apply()?;
    Ok(())
}

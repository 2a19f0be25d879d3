//! Local adapters: filesystem ledger and acquisition through local tools.

pub mod fs;
pub mod ledger;
pub mod ytdlp;

pub use fs::LocalFiles;
pub use ledger::FileLedger;
pub use ytdlp::YtDlpSource;

mod init;
mod sub_id;

pub use init::init_logger;
pub use sub_id::SubId;

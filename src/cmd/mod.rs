mod caption;

pub use caption::cmd_caption;

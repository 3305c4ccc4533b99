pub mod check;
pub mod ci;
pub mod contracts;
pub mod generate;
pub mod graph;
pub mod init;

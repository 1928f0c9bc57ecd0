pub mod connection;
pub mod table_repository;

pub use connection::CsvConnection;
pub use table_repository::CsvBackend;

pub mod empty;

mod common;
mod schedule;
mod store;

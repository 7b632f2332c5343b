pub mod session;
pub mod translator;
pub mod worker;

#[cfg(test)]
mod worker_test;

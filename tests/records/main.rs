//! Integration tests for the record store (Cabinet + backing stores).

mod cascade;
mod concurrency;
mod persistence;
mod renamed;
mod support;

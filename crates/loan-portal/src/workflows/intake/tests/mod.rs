mod common;

mod documents;

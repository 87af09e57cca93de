#![warn(missing_docs)]
//! # The ProseMirror document model
//!
//! This crate is a re-implementation of the document model of
//! [ProseMirror](https://prosemirror.net) in Rust: immutable document trees, marks, schemas and
//! the content automata that decide which children a node may have.

#[macro_use]
extern crate derive_new;

pub mod model;

#[cfg(test)]
mod tests;

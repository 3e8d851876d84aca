//! Purpose: Baseline JSON boundary: one reader and one writer for `Value` trees.
//! Exports: `parse` (reader with object hook), `write` (streaming writer with default hook).
//! Role: Single seam for the grammar so the codec layers only add type handling.
//! Invariants: Neither side knows about rich types beyond handing them to a hook.

pub mod parse;
pub mod write;

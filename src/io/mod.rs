// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - reference mesh loading and progressive stream parsing

mod instruction;
mod obj;
mod progressive;

pub use instruction::Instruction;
pub use obj::{export_obj, load_obj, parse_obj, read_obj, write_obj};
pub use progressive::{
    load_progressive, parse_progressive, read_progressive, ProgressiveStep, ProgressiveStream,
    StepPolicy, FALLBACK_CHECKPOINTS,
};

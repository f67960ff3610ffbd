// Copyright 2025 Roberto Antunes
//
// Licensed under the Functional Source License, Version 1.1 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://github.com/RobAntunes/lingodb/blob/main/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Morphological Parser
//!
//! Composes a phonology FST, a morphology FST, and an n-gram morpheme
//! language model into a single morphophonology transducer, then uses it to
//! recover the rich (form, gloss, category) analysis of a surface
//! transcription.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use morphoparse::core::ObjectId;
//! use morphoparse::fst::morphology::{MorphologyFst, ScriptType};
//! use morphoparse::fst::phonology::PhonologyFst;
//! use morphoparse::lm::LanguageModel;
//! use morphoparse::parser::MorphologicalParser;
//! use morphoparse::toolkit::FomaToolkit;
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! # fn main() -> morphoparse::core::error::Result<()> {
//! let root = "/tmp/lang";
//! let mut morphology = MorphologyFst::new(root, ObjectId(1), "define morphology ?*;", ScriptType::Regex)?;
//! let mut phonology = PhonologyFst::new(root, ObjectId(2), "define phonology ?*;")?;
//! let mut lm = LanguageModel::new(root, ObjectId(3), "chien\n")?;
//!
//! let toolkit = FomaToolkit;
//! morphology.compile(&toolkit, Duration::from_secs(60))?;
//! phonology.compile(&toolkit, Duration::from_secs(60))?;
//!
//! let mut parser = MorphologicalParser::new(root, ObjectId(4), NonZeroUsize::new(1024).unwrap(), true)?;
//! parser.generate_and_compile(Some(&phonology), Some(&morphology), Some(&lm), &toolkit, Duration::from_secs(60))?;
//! let results = parser.parse(&["chien".to_string()], 10, &toolkit, Duration::from_secs(10))?;
//! println!("{:?}", results.get("chien"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized around the components of the subsystem:
//!
//! - [`process`]: runs and times out external toolkit subprocesses (C1)
//! - [`fst::phonology`] / [`fst::morphology`]: the individual FSTs (C2, C3)
//! - [`lm`]: the n-gram morpheme language model and its back-off trie (C4)
//! - [`parse`]: the parse-string <-> triple codec (C5)
//! - [`cache`]: the transcription -> ranked-candidates cache (C6)
//! - [`parser`]: [`parser::MorphologicalParser`], which composes the above
//!   with replication and change detection (C7, C8)
//! - [`toolkit`]: the external FST/LM toolkit adapters (C9)

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod core;
pub mod fst;
pub mod lm;
pub mod logging;
pub mod object;
pub mod parse;
pub mod parser;
pub mod process;
pub mod security;
pub mod toolkit;

pub use crate::cache::{Cache, CacheValue};
pub use crate::core::error::{ParserError, Result};
pub use crate::core::{FileKind, ObjectId, ObjectType};
pub use crate::object::ObjectHandle;
pub use crate::parser::MorphologicalParser;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//! # nutrilabel
//!
//! Heuristic extraction of per-100 g/ml macro nutrients (carbohydrates, protein,
//! fat and the declared calories) from noisy OCR transcriptions of food
//! nutrition labels, with a Google Vision collaborator that turns label photos
//! into text.
//!
//! ```rust
//! use nutrilabel::parse_label_text;
//!
//! let result = parse_label_text("Carboidrati 12 g\nProteine 3 g\nGrassi 1,5 g");
//! assert_eq!(result.confidence, 0.9);
//! ```

pub mod errors;
pub mod label_parser;
pub mod macro_extractor;
pub mod nutrition_patterns;
pub mod nutrition_types;
pub mod ocr;
pub mod ocr_config;
pub mod parser_config;
pub mod text_processing;
pub mod value_locator;
pub mod vocabulary;

pub use errors::{ConfigError, OcrError};
pub use label_parser::{parse_label_text, NutritionLabelParser};
pub use nutrition_types::{ParseResult, Per100};
pub use parser_config::ParserConfig;
pub use vocabulary::Vocabulary;

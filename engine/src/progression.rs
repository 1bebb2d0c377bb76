//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Experience and leveling
//!
//! - [`curve`]: step costs and the award formula
//! - [`formula`]: the arithmetic evaluator behind configurable award formulas
//! - [`state`]: per-actor levels and banked experience

pub mod curve;
pub mod formula;
pub mod state;

pub use curve::{DEFAULT_MAX_LEVEL, ExperienceCurve};
pub use formula::{DEFAULT_AWARD_FORMULA, Formula, FormulaInputs};
pub use state::ProgressionState;

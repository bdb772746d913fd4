//! Engine components: axis and flag tables, the subscenario catalog, scenario
//! composition, temporal expansion, validation and the run lifecycle.

pub mod axes;
pub mod catalog;
pub mod composer;
pub mod domain;
pub mod flags;
pub mod lifecycle;
pub mod scenario;
pub mod temporal;
pub mod validation;

pub mod ledger;
pub mod run;
pub mod scan;

pub mod classification;
pub mod ingest_run;
pub mod skill;
pub mod vacancy;

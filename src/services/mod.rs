pub mod analytics_service;
pub mod classifier_service;
pub mod dedup_service;
pub mod export_service;
pub mod normalization_service;
pub mod pipeline_service;
pub mod quality_service;
pub mod report_service;
pub mod statistics_service;
pub mod vacancy_service;

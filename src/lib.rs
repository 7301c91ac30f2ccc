//! Manuscript calibration server
//!
//! Stores folders of scanned page images, runs them through a remote
//! OCR service, lets users calibrate the recognized text regions, and
//! exports the reconciled result.
//!
//! # Modules
//!
//! - `geometry`: coordinate transform between original and display space
//! - `ocr`: provider trait, retrying service, normalizer, batch pipeline
//! - `annotations`: annotation model and calibration session state
//! - `library`: folder model and upload validation
//! - `db`: SQLite persistence (folders, annotations, chunked images)
//! - `export`: reconciliation engine and export document
//! - `routes`: HTTP API

pub mod annotations;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod geometry;
pub mod library;
pub mod ocr;
pub mod routes;
pub mod state;

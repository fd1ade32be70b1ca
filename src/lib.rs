// ==============================================================================
// lib.rs - Virtual Panel Library
// ==============================================================================
// Description: Library interface for the virtual panel variant workflow
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod audit;
pub mod config;
pub mod filter;
pub mod models;
pub mod output;
pub mod panel;
pub mod parsers;
pub mod pipeline;
pub mod processor;
pub mod region_file;
pub mod resolver;
pub mod validator;

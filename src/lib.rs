// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod db;
pub mod error;
pub mod models;
pub mod utils;
pub mod registry;
pub mod ledger;
pub mod transfer;
pub mod journal;
pub mod tags;
pub mod contacts;
pub mod periods;
pub mod import;
pub mod report;
pub mod commands;

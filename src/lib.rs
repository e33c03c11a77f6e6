// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Document revision tracking for watched folders.
//!
//! Libra follows office documents across their revisions. Each watched folder
//! carries a metadata document naming the current revision file of every
//! tracked document, who produced it, and the revisions that came before.
//!
//! The heart of Libra is [`reconcile`](reconcile::reconcile), which aligns a
//! metadata document with the files physically present in its folder, and
//! the [`version`] predicates that drive bulk selection when clearing old
//! history entries. Everything else feeds these two: [`meta`] persists
//! metadata documents, [`listing`] lists folders past lock and temporary
//! files, [`scan`] runs a full reconciliation pass over a folder, [`track`]
//! commits new revisions, [`history`] clears old ones, and [`watch`] triggers
//! rescans as folders change.

pub mod config;
pub mod history;
pub mod listing;
pub mod meta;
pub mod path;
pub mod reconcile;
pub mod scan;
pub mod track;
pub mod version;
pub mod watch;

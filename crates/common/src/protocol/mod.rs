// Wire protocols consumed by the sync core.

pub mod rest;

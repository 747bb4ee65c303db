pub mod controller;
pub mod domain;
pub mod entity;
pub mod export;
pub mod fields;
pub mod filter;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod paginator;
pub mod record;
pub mod selection;
pub mod session;
pub mod sort;
pub mod source;
pub mod table;
pub mod ui;

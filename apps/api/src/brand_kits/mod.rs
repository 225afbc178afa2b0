// HTTP handlers for stored brand kits and their target-audience lists.

pub mod handlers;

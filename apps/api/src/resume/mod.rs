// Resume CRUD and optimization history. Conventional glue around the
// document table; the queue subsystem only ever references resumes by id.

pub mod handlers;
pub mod store;

mod profile;

pub use profile::ProfileServiceImpl;

mod maildir;

pub use maildir::MaildirStore;

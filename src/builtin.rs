pub const BUILTIN_CSS: &str = include_str!("builtin.css");

pub const THEME_COLOR: &str = "#303030";
pub const FAVICON_URL: &str = "https://storage.googleapis.com/async-await/async-favicon32.png";
pub const GOOGLE_LOGO_URL: &str = "https://storage.googleapis.com/async-await-all/G.svg";

/// Remote stylesheets linked from every page head.
pub const EXTERNAL_STYLESHEETS: &[&str] = &[
    "https://fonts.googleapis.com/icon?family=Material+Icons",
    "https://storage.googleapis.com/async-await/vs2015.min.css",
];

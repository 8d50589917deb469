#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;

use poem::Request;
use log::{debug, LevelFilter};

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  Unlike canonicalize, absolutize
 * does not require the file to exist.
 *
 * On any failure the original path is returned unchanged.
 */
pub fn get_absolute_path(path: &str) -> String {
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    match p1.to_str() {
        Some(x) => x.to_owned(),
        None => path.to_owned(),
    }
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    if log::max_level() < LevelFilter::Debug {
        return;
    }

    let mut s = "\n".to_string();

    let uri = http_req.uri();
    s += format!("  URI: {:?}\n", uri).as_str();

    // Never write the caller's credentials to the log.
    for (name, value) in http_req.headers().iter() {
        if *name == poem::http::header::AUTHORIZATION {
            s += format!("  Header: {} = <redacted>\n", name).as_str();
        } else {
            s += format!("  Header: {} = {:?} \n", name, value).as_str();
        }
    }

    s += req.get_request_info().as_str();

    debug!("{}", s);
}

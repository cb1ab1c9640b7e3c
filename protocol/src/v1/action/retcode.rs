use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq, Clone)]
pub struct Retcode {
    #[serde(rename = "retcode")]
    ret_code: i32,
    message: String,
}

impl Retcode {
    pub fn with_message(&self, msg: &str) -> Retcode {
        Retcode {
            ret_code: self.ret_code,
            message: format!("{}: {}", self.message, msg),
        }
    }

    pub fn code(&self) -> i32 {
        self.ret_code
    }
}

lazy_static! {
    pub static ref OK: Retcode = Retcode {
        ret_code: 0,
        message: "ok".to_string(),
    };

    // Request Errors (10000-19999)
    pub static ref REQUEST_ERROR: Retcode = Retcode {
        ret_code: 10000,
        message: "Request Error".to_string(),
    };
    pub static ref BAD_REQUEST: Retcode = Retcode {
        ret_code: 10001,
        message: "Bad Request".to_string(),
    };
    pub static ref PARAM_ERROR: Retcode = Retcode {
        ret_code: 10006,
        message: "Param Error".to_string(),
    };

    // Unexpected Error
    pub static ref UNEXPECTED_ERROR: Retcode = Retcode {
        ret_code: 20001,
        message: "Unexpected Error".to_string(),
    };

    // File Errors (21000-21999)
    pub static ref FILE_ERROR: Retcode = Retcode {
        ret_code: 21000,
        message: "File Error".to_string(),
    };
    pub static ref FILE_NOT_FOUND: Retcode = Retcode {
        ret_code: 21001,
        message: "File Not Found".to_string(),
    };
    pub static ref FILE_ACCESS_DENIED: Retcode = Retcode {
        ret_code: 21006,
        message: "File Access Denied".to_string(),
    };

    // Server Errors (30000-39999)
    pub static ref SERVER_ERROR: Retcode = Retcode {
        ret_code: 30000,
        message: "Server Error".to_string(),
    };
    pub static ref SERVER_NOT_FOUND: Retcode = Retcode {
        ret_code: 30001,
        message: "Server Not Found".to_string(),
    };
    pub static ref SERVER_NOT_RUNNING: Retcode = Retcode {
        ret_code: 30002,
        message: "Server Not Running".to_string(),
    };
    pub static ref ARTIFACT_MISSING: Retcode = Retcode {
        ret_code: 30003,
        message: "Launch Artifact Missing".to_string(),
    };
    pub static ref LAUNCH_FAILED: Retcode = Retcode {
        ret_code: 30004,
        message: "Launch Failed".to_string(),
    };
}

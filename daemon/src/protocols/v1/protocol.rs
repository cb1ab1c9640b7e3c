use super::super::Protocol;
use crate::error::Error;
use crate::management::ServerManager;
use crafthost_protocol::management::server::CreateServerRequest;
use crafthost_protocol::v1::action::retcode::Retcode;
use crafthost_protocol::v1::action::{
    retcode, ActionParameters, ActionRequest, ActionResponse, ActionResults, ActionStatus,
};
use std::sync::Arc;
use uuid::Uuid;

pub struct ProtocolV1 {
    manager: Arc<ServerManager>,
}

impl Protocol for ProtocolV1 {
    fn parse_request<'req>(
        &self,
        raw: &'req str,
    ) -> Result<ActionRequest<'req>, ActionResponse> {
        serde_json::from_str::<ActionRequest>(raw).map_err(|err| {
            log::error!("action error: {}", err);
            Self::err(retcode::BAD_REQUEST.clone(), Uuid::nil())
        })
    }

    async fn process(&self, raw: &str) -> String {
        serde_json::to_string(&self.dispatch(raw).await).unwrap()
    }
}

impl ProtocolV1 {
    pub fn new(manager: Arc<ServerManager>) -> Self {
        Self { manager }
    }

    async fn dispatch(&self, raw: &str) -> ActionResponse {
        let request = match self.parse_request(raw) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let id = request.id;

        let result = match request.parameters {
            ActionParameters::ListServers {} => self
                .manager
                .list_servers()
                .await
                .map(|servers| ActionResults::ServerList { servers }),
            ActionParameters::CreateServer {
                name,
                server_type,
                version,
                port,
                ram_mb,
            } => self
                .manager
                .create_server(CreateServerRequest {
                    name: name.to_owned(),
                    server_type,
                    version: version.to_owned(),
                    port,
                    ram_mb,
                })
                .await
                .map(|server| ActionResults::Server { server }),
            ActionParameters::StartServer { server_id } => self
                .manager
                .start_server(server_id)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::StopServer { server_id } => self
                .manager
                .stop_server(server_id)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::DeleteServer { server_id } => self
                .manager
                .delete_server(server_id)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::SendCommand { server_id, command } => self
                .manager
                .send_command(server_id, command)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::GetLogs { server_id, limit } => self
                .manager
                .get_logs(server_id, limit)
                .await
                .map(|logs| ActionResults::Logs { logs }),
            ActionParameters::GetStats { server_id } => self
                .manager
                .get_stats(server_id)
                .await
                .map(|stats| ActionResults::Stats { stats }),
            ActionParameters::ListFiles { server_id, path } => self
                .manager
                .list_files(server_id, &path)
                .await
                .map(|files| ActionResults::Files { files }),
            ActionParameters::ReadFile { server_id, path } => self
                .manager
                .read_file(server_id, path)
                .await
                .map(|content| ActionResults::FileContent { content }),
            ActionParameters::WriteFile {
                server_id,
                path,
                content,
            } => self
                .manager
                .write_file(server_id, path, content)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::DeleteFile { server_id, path } => self
                .manager
                .delete_file(server_id, path)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::CreateFolder { server_id, path } => self
                .manager
                .create_folder(server_id, path)
                .await
                .map(|_| ActionResults::Empty {}),
            ActionParameters::UploadFile {
                server_id,
                path,
                data,
            } => self
                .manager
                .upload_file(server_id, path, &data)
                .await
                .map(|_| ActionResults::Empty {}),
        };

        match result {
            Ok(data) => Self::ok(data, id),
            Err(err) => {
                log::error!("action error: {}", err);
                Self::err(Self::retcode_for(&err), id)
            }
        }
    }

    fn retcode_for(err: &Error) -> Retcode {
        let detail = err.to_string();
        match err {
            Error::ServerNotFound(_) => retcode::SERVER_NOT_FOUND.with_message(&detail),
            Error::Validation(_) => retcode::PARAM_ERROR.with_message(&detail),
            Error::MissingArtifact(_) => retcode::ARTIFACT_MISSING.with_message(&detail),
            Error::NotRunning(_) => retcode::SERVER_NOT_RUNNING.with_message(&detail),
            Error::Launch(_) => retcode::LAUNCH_FAILED.with_message(&detail),
            Error::PathDenied(_) => retcode::FILE_ACCESS_DENIED.with_message(&detail),
            Error::Io(_) => retcode::FILE_ERROR.with_message(&detail),
            Error::Persist(_) => retcode::UNEXPECTED_ERROR.with_message(&detail),
        }
    }

    fn ok(data: ActionResults, id: Uuid) -> ActionResponse {
        ActionResponse {
            status: ActionStatus::Ok,
            data,
            retcode: retcode::OK.clone(),
            id,
        }
    }

    fn err(retcode: Retcode, id: Uuid) -> ActionResponse {
        ActionResponse {
            status: ActionStatus::Error,
            data: ActionResults::Empty {},
            retcode,
            id,
        }
    }
}

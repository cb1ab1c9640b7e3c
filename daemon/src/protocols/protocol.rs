use crafthost_protocol::v1::action::{ActionRequest, ActionResponse};

/// One wire protocol version: parse a raw request, run it against the
/// manager, serialize a reply. Transports stay outside this crate.
pub trait Protocol {
    fn parse_request<'req>(&self, raw: &'req str)
        -> Result<ActionRequest<'req>, ActionResponse>;

    async fn process(&self, raw: &str) -> String;
}

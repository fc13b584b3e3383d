use actix_web::web;

use crate::error::AppResult;
use crate::modules::message::models::{
    AddMessageParams, AddMessageResponse, NewMessage,
};
use crate::modules::message::repository::MessageRepository;

/// 追加一条消息并返回该用户最近 10 条消息与当前总数
///
/// 参数与原始客户端保持一致，通过查询串传递
#[utoipa::path(
    post,
    path = "/add_message",
    params(AddMessageParams),
    responses(
        (status = 200, description = "消息已写入，返回最近消息与总数", body = AddMessageResponse),
        (status = 400, description = "参数验证失败，未执行写入"),
        (status = 500, description = "序列号冲突重试耗尽"),
        (status = 503, description = "存储不可用"),
    ),
    tag = "Message"
)]
#[actix_web::post("/add_message")]
pub async fn add_message(
    repo: web::Data<MessageRepository>,
    params: web::Query<AddMessageParams>,
) -> AppResult<web::Json<AddMessageResponse>> {
    let msg = NewMessage::parse(params.into_inner())?;
    let outcome = repo.append(&msg).await?;
    Ok(web::Json(AddMessageResponse::from(outcome)))
}

/// 配置消息模块的路由
pub fn configure_message_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(add_message);
}

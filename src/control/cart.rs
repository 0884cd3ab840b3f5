use actix_session::Session;
use actix_web::web::{Data, Path};
use actix_web::{get, post, HttpResponse};
use log_error::LogError;
use serde::Deserialize;
use serde_json::json;

use crate::cart::{self, CartLine, CartRepository};
use crate::product::ProductRepository;

use super::{visitor_id, AppState, ControllerError, InputData, Response};

async fn lines(state: &AppState, visitor: &str) -> Result<Vec<CartLine>, ControllerError> {
    let items = state.cart.list(visitor).await?;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = state
            .products
            .get(item.product_id)
            .await?
            .log_error("Cart row points at a missing product");
        if let Some(product) = product {
            lines.push(CartLine { item, product });
        }
    }
    Ok(lines)
}

fn cart_json(lines: &[CartLine]) -> serde_json::Value {
    json!({
        "items": lines,
        "total": cart::cart_total(lines),
        "count": lines.iter().map(|l| l.item.quantity as u64).sum::<u64>(),
    })
}

#[get("/cart")]
pub async fn view(session: Session, state: Data<AppState>) -> Response {
    let visitor = visitor_id(&session)?;
    let lines = lines(&state, &visitor).await?;
    Ok(HttpResponse::Ok().json(cart_json(&lines)))
}

#[derive(Debug, Deserialize)]
pub struct QuantityInput {
    pub quantity: Option<u32>,
}

#[post("/cart/add/{product_id}")]
pub async fn add(
    path: Path<i64>,
    input: InputData<QuantityInput>,
    session: Session,
    state: Data<AppState>,
) -> Response {
    let product_id = path.into_inner();
    let requested = input.into_inner().quantity.unwrap_or(1);
    let visitor = visitor_id(&session)?;
    let product = state
        .products
        .get(product_id)
        .await?
        .ok_or(ControllerError::NotFound)?;
    let existing = state
        .cart
        .find(&visitor, product_id)
        .await?
        .map(|item| item.quantity)
        .unwrap_or(0);
    let quantity = cart::merge_quantity(existing, requested, product.stock);
    if quantity == 0 {
        return Err(ControllerError::Conflict(format!(
            "{} is out of stock",
            product.name
        )));
    }
    state.cart.add(&visitor, product_id, quantity).await?;
    let lines = lines(&state, &visitor).await?;
    Ok(HttpResponse::Ok().json(cart_json(&lines)))
}

#[post("/cart/update/{item_id}")]
pub async fn update(
    path: Path<i64>,
    input: InputData<QuantityInput>,
    session: Session,
    state: Data<AppState>,
) -> Response {
    let item_id = path.into_inner();
    let visitor = visitor_id(&session)?;
    let item = state
        .cart
        .get(item_id)
        .await?
        .filter(|item| item.visitor_id == visitor)
        .ok_or(ControllerError::NotFound)?;
    let requested = input.into_inner().quantity.unwrap_or(1);
    let stock = state
        .products
        .get(item.product_id)
        .await?
        .map(|p| p.stock)
        .unwrap_or(0);
    let quantity = requested.min(stock);
    if quantity == 0 {
        state.cart.remove(item.id).await?;
    } else {
        state.cart.set_quantity(item.id, quantity).await?;
    }
    let lines = lines(&state, &visitor).await?;
    Ok(HttpResponse::Ok().json(cart_json(&lines)))
}

#[post("/cart/clear")]
pub async fn clear(session: Session, state: Data<AppState>) -> Response {
    let visitor = visitor_id(&session)?;
    state.cart.clear(&visitor).await?;
    Ok(HttpResponse::Ok().json(cart_json(&[])))
}

#[post("/cart/remove/{item_id}")]
pub async fn remove(path: Path<i64>, session: Session, state: Data<AppState>) -> Response {
    let item_id = path.into_inner();
    let visitor = visitor_id(&session)?;
    let item = state
        .cart
        .get(item_id)
        .await?
        .filter(|item| item.visitor_id == visitor)
        .ok_or(ControllerError::NotFound)?;
    state.cart.remove(item.id).await?;
    let lines = lines(&state, &visitor).await?;
    Ok(HttpResponse::Ok().json(cart_json(&lines)))
}

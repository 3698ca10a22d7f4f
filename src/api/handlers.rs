use std::sync::Arc;

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::error::ApiError;
use super::validation::{CreateCustomerRequest, ListCustomersQuery, UpdateCustomerRequest};
use crate::domain::customer::CustomerService;

type Service = web::Data<Arc<CustomerService>>;

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::invalid("id", format!("Invalid uuid '{raw}'")))
}

pub async fn create_customer(
    service: Service,
    body: web::Json<CreateCustomerRequest>,
) -> Result<HttpResponse, ApiError> {
    let input = body.into_inner().validate().map_err(ApiError::Validation)?;
    let customer = service.create(input).await?;
    Ok(HttpResponse::Created().json(customer))
}

pub async fn get_customer(service: Service, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let customer = service.find_by_id(parse_id(&id)?).await?;
    Ok(HttpResponse::Ok().json(customer))
}

pub async fn list_customers(
    service: Service,
    query: web::Query<ListCustomersQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner().validate().map_err(ApiError::Validation)?;
    let page = service.find_all(query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn update_customer(
    service: Service,
    id: web::Path<String>,
    body: web::Json<UpdateCustomerRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&id)?;
    let input = body.into_inner().validate().map_err(ApiError::Validation)?;
    let customer = service.update(id, input).await?;
    Ok(HttpResponse::Ok().json(customer))
}

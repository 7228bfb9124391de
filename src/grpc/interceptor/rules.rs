//! Method → minimum role table
//!
//! Built once at startup and shared read-only. A method missing from the
//! table is denied for every caller.

use crate::domain::Role;
use std::collections::HashMap;

/// Fully-qualified gRPC method names
pub mod methods {
    pub const REGISTER_USER: &str = "/user.UserService/RegisterUser";
    pub const LOGIN_USER: &str = "/user.UserService/LoginUser";
    pub const SEND_VERIFICATION_CODE: &str = "/user.UserService/SendVerificationCode";
    pub const CONFIRM_EMAIL: &str = "/user.UserService/ConfirmEmail";
    pub const GET_PROFILE: &str = "/user.UserService/GetProfile";
    pub const LIST_USERS: &str = "/user.UserService/ListUsers";
    pub const CHANGE_USER_ROLE: &str = "/user.UserService/ChangeUserRole";

    pub const LIST_CARS: &str = "/car.CarService/ListCars";
    pub const GET_CAR: &str = "/car.CarService/GetCar";
    pub const CREATE_CAR: &str = "/car.CarService/CreateCar";
    pub const UPDATE_CAR: &str = "/car.CarService/UpdateCar";
    pub const DELETE_CAR: &str = "/car.CarService/DeleteCar";
    pub const DECREASE_STOCK: &str = "/car.CarService/DecreaseStock";

    pub const CREATE_ORDER: &str = "/order.OrderService/CreateOrder";
    pub const GET_ORDER: &str = "/order.OrderService/GetOrder";
    pub const LIST_ORDERS: &str = "/order.OrderService/ListOrders";
    pub const UPDATE_ORDER: &str = "/order.OrderService/UpdateOrder";
    pub const DELETE_ORDER: &str = "/order.OrderService/DeleteOrder";
}

#[derive(Debug, Clone, Default)]
pub struct MethodRules {
    rules: HashMap<String, Role>,
}

impl MethodRules {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, Role)>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(|(m, r)| (m.into(), r)).collect(),
        }
    }

    /// The CarStore method table.
    pub fn default_rules() -> Self {
        use methods::*;

        Self::new([
            (REGISTER_USER, Role::Anonymous),
            (LOGIN_USER, Role::Anonymous),
            (SEND_VERIFICATION_CODE, Role::Anonymous),
            (CONFIRM_EMAIL, Role::Anonymous),
            (GET_PROFILE, Role::User),
            (LIST_USERS, Role::Admin),
            (CHANGE_USER_ROLE, Role::Admin),
            (LIST_CARS, Role::Anonymous),
            (GET_CAR, Role::Anonymous),
            (CREATE_CAR, Role::Admin),
            (UPDATE_CAR, Role::Admin),
            (DELETE_CAR, Role::Admin),
            (DECREASE_STOCK, Role::User),
            (CREATE_ORDER, Role::User),
            (GET_ORDER, Role::User),
            (LIST_ORDERS, Role::Admin),
            (UPDATE_ORDER, Role::Admin),
            (DELETE_ORDER, Role::Admin),
        ])
    }

    /// Minimum role for `method`, or `None` when the method is not listed.
    pub fn required_role(&self, method: &str) -> Option<Role> {
        self.rules.get(method).copied()
    }

    /// Every `(method, minimum role)` pair, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Role)> + '_ {
        self.rules.iter().map(|(m, r)| (m.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

//! Cart, pricing and history working together over one device's storage.

use std::sync::Arc;

use jiff::Timestamp;
use mala::{
    cart::{CartProduct, CartStore},
    clock::{Clock, ManualClock},
    discounts::DiscountSchedule,
    history::OrderHistory,
    session::Sessions,
    storage::{MemoryStorage, Storage},
    uuids::TypedUuid,
};
use rusty_money::{Money, iso::THB};
use testresult::TestResult;

fn product(name: &str, unit_price: u64) -> CartProduct {
    CartProduct {
        id: TypedUuid::now_v7(),
        name: name.to_string(),
        localized_name: None,
        unit_price,
        image_reference: None,
    }
}

#[test]
fn totals_follow_cart_through_discount_threshold() -> TestResult {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let cart = CartStore::new(storage);
    let schedule = DiscountSchedule::standard(THB);
    let p1 = product("P1", 15_00);
    let p2 = product("P2", 20_00);

    cart.add(p1.clone())?;
    cart.add(p1.clone())?;
    cart.add(p2)?;

    let totals = cart.totals(&schedule)?;

    assert_eq!(totals.subtotal, Money::from_minor(50_00, THB));
    assert_eq!(totals.stick_count, 3);
    assert_eq!(totals.discount, Money::from_minor(0, THB));
    assert_eq!(totals.total, Money::from_minor(50_00, THB));

    for _ in 0..7 {
        cart.add(p1.clone())?;
    }

    let totals = cart.totals(&schedule)?;

    assert_eq!(totals.stick_count, 10);
    assert_eq!(totals.subtotal, Money::from_minor(155_00, THB));
    assert_eq!(totals.discount, Money::from_minor(10_00, THB));
    assert_eq!(totals.total, Money::from_minor(145_00, THB));

    Ok(())
}

#[test]
fn device_state_survives_a_restart() -> TestResult {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Timestamp::now()));
    let order = TypedUuid::now_v7();

    {
        let session = Sessions::new(Arc::clone(&storage), Arc::clone(&clock)).get_or_create()?;

        CartStore::new(Arc::clone(&storage)).add(product("P1", 15_00))?;
        OrderHistory::new(Arc::clone(&storage), session).record(order)?;
    }

    let session = Sessions::new(Arc::clone(&storage), clock).get_or_create()?;

    assert_eq!(CartStore::new(Arc::clone(&storage)).item_count()?, 1);
    assert_eq!(OrderHistory::new(storage, session).list()?, vec![order]);

    Ok(())
}

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use fulfil::{
    money::{Money, Quantity},
    status::{DeliveryStatus, OrderStatus, PaymentStatus},
    validation::ValidationError,
};
use jiff::Timestamp;
use testresult::TestResult;
use tokio::sync::Mutex;

use crate::{
    clock::{Clock, FixedClock},
    domain::{
        Stores,
        carts::{
            CartsService, CartsStore, MemoryCartsStore, MockCartsStore,
            records::{CartItemRecord, CartRecord},
        },
        errors::StoreError,
        orders::records::{OrderRecord, OrderUuid},
        payments::{
            data::{NewPayment, PaymentUpdate},
            records::{PaymentContact, PaymentUuid},
        },
        products::{
            MemoryProductsStore, ProductsStore,
            data::{NewProduct, ProductUpdate},
            records::{ProductRecord, ProductUuid},
        },
        users::{Actor, UserUuid},
    },
    lifecycle::{DEFAULT_CARRIER, Missing, OrderError, OrderLifecycle},
    payments::{
        ChargeOutcome, GatewayError, MockPaymentGateway, PaymentDetails, PaymentGateway,
        RefundOutcome, SandboxGateway,
    },
};

const VISA: &str = "4242424242424242";
const DECLINED_VISA: &str = "4242424242420000";

struct Harness {
    engine: OrderLifecycle,
    stores: Stores,
    carts: CartsService,
    gateway: Arc<SandboxGateway>,
    clock: Arc<FixedClock>,
    admin: Actor,
}

fn start() -> TestResult<Timestamp> {
    Ok("2026-10-18T09:30:00Z".parse()?)
}

fn harness() -> TestResult<Harness> {
    harness_with(Stores::memory())
}

fn harness_with(stores: Stores) -> TestResult<Harness> {
    let gateway = Arc::new(SandboxGateway::new());
    let clock = Arc::new(FixedClock::new(start()?));

    let engine = OrderLifecycle::new(stores.clone(), gateway.clone(), clock.clone());
    let carts = CartsService::new(stores.carts.clone(), stores.products.clone());

    Ok(Harness {
        engine,
        stores,
        carts,
        gateway,
        clock,
        admin: Actor::admin(UserUuid::new()),
    })
}

fn card(number: &str) -> PaymentDetails {
    PaymentDetails::card(number, "123", 12, 2030)
}

impl Harness {
    async fn product(&self, name: &str, price: u64, stock: u32) -> TestResult<ProductUuid> {
        let product = self
            .stores
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: name.to_string(),
                price: Money::from_minor(price),
                stock_qty: stock,
                active: true,
            })
            .await?;

        Ok(product.uuid)
    }

    async fn stock(&self, product: ProductUuid) -> TestResult<ProductRecord> {
        Ok(self.stores.products.get_product(product).await?)
    }

    async fn add(&self, user: UserUuid, product: ProductUuid, quantity: i64) -> TestResult {
        self.carts
            .add_to_cart(user, product, Quantity::new(quantity)?)
            .await?;

        Ok(())
    }

    /// A customer with a checked-out order for `quantity` units of `product`.
    async fn ordered(&self, product: ProductUuid, quantity: i64) -> TestResult<(Actor, OrderRecord)> {
        let customer = Actor::customer(UserUuid::new());

        self.add(customer.user, product, quantity).await?;

        let order = self.engine.checkout(customer.user).await?;

        Ok((customer, order))
    }

    async fn paid(&self, product: ProductUuid, quantity: i64) -> TestResult<(Actor, OrderRecord)> {
        let (customer, order) = self.ordered(product, quantity).await?;

        let paid = self.engine.pay(customer, order.uuid, &card(VISA)).await?;

        Ok((customer, paid.order))
    }
}

#[tokio::test]
async fn checkout_pay_and_cancel_round_trip() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;

    let (customer, order) = h.ordered(product, 1).await?;

    assert_eq!(order.status, OrderStatus::Created);

    let sold_out = h.stock(product).await?;
    assert_eq!(sold_out.stock_qty, 0);
    assert!(!sold_out.active, "sold-out product must leave the catalog");

    let paid = h.engine.pay(customer, order.uuid, &card(VISA)).await?;

    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert_eq!(paid.payment.status, PaymentStatus::Succeeded);
    assert_eq!(paid.payment.amount, Money::from_minor(1_500));
    assert_eq!(paid.payment.card_last4, "4242");

    let cancellation = h.engine.cancel(h.admin, order.uuid).await?;

    assert_eq!(cancellation.order.status, OrderStatus::Refunded);
    assert_eq!(cancellation.refunded, Money::from_minor(1_500));
    assert!(cancellation.order.timeline.cancelled_at.is_some(), "cancelled_at must be set");
    assert!(cancellation.order.timeline.refunded_at.is_some(), "refunded_at must be set");

    let payments = h.engine.payments(customer, order.uuid).await?;
    assert!(
        payments.iter().all(|p| p.status == PaymentStatus::Refunded),
        "every payment must be refunded, got {payments:?}"
    );

    let restocked = h.stock(product).await?;
    assert_eq!(restocked.stock_qty, 1);
    assert!(restocked.active, "restocked product must come back");

    Ok(())
}

#[tokio::test]
async fn failed_checkout_leaves_stock_and_cart_untouched() -> TestResult {
    let h = harness()?;
    let plenty = h.product("Lampe", 1_500, 5).await?;
    let scarce = h.product("Tapis", 4_990, 2).await?;
    let user = UserUuid::new();

    h.add(user, plenty, 2).await?;
    h.add(user, scarce, 2).await?;

    // Someone else takes one of the two rugs after this cart was filled.
    h.stores.products.reserve(scarce, Quantity::ONE).await?;

    let result = h.engine.checkout(user).await;

    assert!(
        matches!(&result, Err(OrderError::InsufficientStock { product }) if product == "Tapis"),
        "expected InsufficientStock, got {result:?}"
    );

    assert_eq!(h.stock(plenty).await?.stock_qty, 5);
    assert_eq!(h.stock(scarce).await?.stock_qty, 1);
    assert_eq!(h.carts.get_cart(user).await?.items.len(), 2);
    assert!(h.stores.orders.list_orders_for_user(user).await?.is_empty(), "no order may be created");

    Ok(())
}

#[tokio::test]
async fn checkout_of_an_empty_cart_is_rejected() -> TestResult {
    let h = harness()?;

    let result = h.engine.checkout(UserUuid::new()).await;

    assert!(
        matches!(result, Err(OrderError::EmptyCart)),
        "expected EmptyCart, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn order_lines_keep_the_checkout_price() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 3).await?;

    let (customer, order) = h.ordered(product, 2).await?;

    h.stores
        .products
        .update_product(
            product,
            ProductUpdate {
                name: Some("Lampe design".to_string()),
                price: Some(Money::from_minor(9_900)),
                active: None,
            },
        )
        .await?;

    let stored = h.engine.order(customer, order.uuid).await?;

    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines.first().map(|l| l.name.as_str()), Some("Lampe"));
    assert_eq!(stored.total(), Money::from_minor(3_000));
    assert!(h.carts.get_cart(customer.user).await?.is_empty(), "cart must be cleared");

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let first = UserUuid::new();
    let second = UserUuid::new();

    h.add(first, product, 1).await?;
    h.add(second, product, 1).await?;

    let (a, b) = tokio::join!(h.engine.checkout(first), h.engine.checkout(second));

    assert_eq!(
        usize::from(a.is_ok()) + usize::from(b.is_ok()),
        1,
        "exactly one checkout may win the last unit: {a:?} / {b:?}"
    );
    assert_eq!(h.stock(product).await?.stock_qty, 0);

    Ok(())
}

#[tokio::test]
async fn cards_ending_in_zeros_are_declined_and_can_be_retried() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(product, 1).await?;

    let declined = h.engine.pay(customer, order.uuid, &card(DECLINED_VISA)).await;

    assert!(
        matches!(&declined, Err(OrderError::PaymentDeclined { reason }) if reason == "card refused"),
        "expected PaymentDeclined, got {declined:?}"
    );
    assert_eq!(h.engine.order(customer, order.uuid).await?.status, OrderStatus::Created);

    let paid = h.engine.pay(customer, order.uuid, &card(VISA)).await?;

    assert_eq!(paid.order.status, OrderStatus::Paid);

    let payments = h.engine.payments(customer, order.uuid).await?;
    let keys: Vec<_> = payments.iter().map(|p| p.idempotency_key.clone()).collect();
    let statuses: Vec<_> = payments.iter().map(|p| p.status).collect();

    assert_eq!(keys, vec![format!("{}:1", order.uuid), format!("{}:2", order.uuid)]);
    assert_eq!(statuses, vec![PaymentStatus::Failed, PaymentStatus::Succeeded]);
    assert_eq!(
        payments.first().and_then(|p| p.failure_reason.as_deref()),
        Some("card refused")
    );
    assert_eq!(h.gateway.executed_charges(), 2);

    Ok(())
}

#[tokio::test]
async fn invalid_card_fields_record_no_payment() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(product, 1).await?;

    let result = h
        .engine
        .pay(customer, order.uuid, &card("4242424242424241"))
        .await;

    assert!(
        matches!(result, Err(OrderError::ValidationFailed(ValidationError::CardNumberInvalid))),
        "expected ValidationFailed, got {result:?}"
    );
    assert!(h.engine.payments(customer, order.uuid).await?.is_empty(), "no payment may be recorded");
    assert_eq!(h.gateway.executed_charges(), 0);

    Ok(())
}

#[tokio::test]
async fn paying_twice_never_charges_twice() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.paid(product, 1).await?;

    let again = h.engine.pay(customer, order.uuid, &card(VISA)).await;

    assert!(
        matches!(again, Err(OrderError::InvalidState { status: OrderStatus::Paid, .. })),
        "expected InvalidState, got {again:?}"
    );

    let succeeded = h
        .engine
        .payments(customer, order.uuid)
        .await?
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Succeeded)
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(h.gateway.executed_charges(), 1);

    Ok(())
}

#[tokio::test]
async fn gateway_outage_leaves_a_pending_payment_reused_on_retry() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(product, 1).await?;

    let expected_key = format!("{}:1", order.uuid);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut gateway = MockPaymentGateway::new();

    gateway
        .expect_charge()
        .withf(move |card, amount, key| {
            card == VISA && *amount == Money::from_minor(1_500) && key == expected_key
        })
        .times(2)
        .returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GatewayError::Unavailable)
            } else {
                Ok(ChargeOutcome::Approved {
                    transaction_id: "txn_retry".to_string(),
                })
            }
        });

    let engine = OrderLifecycle::new(h.stores.clone(), Arc::new(gateway), h.clock.clone());

    let outage = engine.pay(customer, order.uuid, &card(VISA)).await;

    assert!(
        matches!(outage, Err(OrderError::Gateway(GatewayError::Unavailable))),
        "expected Gateway, got {outage:?}"
    );

    let pending = engine.payments(customer, order.uuid).await?;

    assert_eq!(pending.len(), 1);
    assert_eq!(pending.first().map(|p| p.status), Some(PaymentStatus::Pending));

    let paid = engine.pay(customer, order.uuid, &card(VISA)).await?;

    assert_eq!(paid.payment.uuid, pending.first().map(|p| p.uuid).ok_or("no payment")?);
    assert_eq!(paid.payment.transaction_id.as_deref(), Some("txn_retry"));
    assert_eq!(engine.payments(customer, order.uuid).await?.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn ship_and_deliver_a_paid_order() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 2).await?;
    let (customer, order) = h.paid(product, 1).await?;

    h.clock.advance(3_600);

    let shipment = h.engine.admin_ship(h.admin, order.uuid, None).await?;

    assert_eq!(shipment.order.status, OrderStatus::Shipped);
    assert_eq!(shipment.delivery.status, DeliveryStatus::InTransit);
    assert_eq!(shipment.delivery.carrier, DEFAULT_CARRIER);
    assert_eq!(
        shipment.delivery.tracking_number,
        format!("TRK-{}", order.uuid.into_uuid().simple()).to_ascii_uppercase()
    );

    h.clock.advance(86_400);

    let delivered = h.engine.admin_mark_delivered(h.admin, order.uuid).await?;

    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    assert_eq!(delivered.delivery.status, DeliveryStatus::Delivered);
    assert_eq!(delivered.delivery.uuid, shipment.delivery.uuid);
    assert_eq!(h.engine.delivery(customer, order.uuid).await?, delivered.delivery);

    let cancel = h.engine.cancel(customer, order.uuid).await;

    assert!(
        matches!(cancel, Err(OrderError::InvalidState { status: OrderStatus::Delivered, .. })),
        "expected InvalidState, got {cancel:?}"
    );

    Ok(())
}

#[tokio::test]
async fn validated_orders_ship_with_the_named_carrier() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 2).await?;
    let (_, order) = h.ordered(product, 1).await?;

    let premature = h.engine.admin_ship(h.admin, order.uuid, Some("Colissimo")).await;

    assert!(
        matches!(premature, Err(OrderError::InvalidState { status: OrderStatus::Created, .. })),
        "expected InvalidState, got {premature:?}"
    );

    let validated = h.engine.admin_validate(h.admin, order.uuid).await?;

    assert_eq!(validated.status, OrderStatus::Validated);
    assert!(validated.timeline.validated_at.is_some(), "validated_at must be set");

    let shipment = h
        .engine
        .admin_ship(h.admin, order.uuid, Some("Colissimo"))
        .await?;

    assert_eq!(shipment.delivery.carrier, "Colissimo");

    let again = h.engine.admin_ship(h.admin, order.uuid, None).await;

    assert!(
        matches!(again, Err(OrderError::InvalidState { status: OrderStatus::Shipped, .. })),
        "expected InvalidState, got {again:?}"
    );

    Ok(())
}

#[tokio::test]
async fn delivery_lookup_before_shipping_is_not_found() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(product, 1).await?;

    let result = h.engine.delivery(customer, order.uuid).await;

    assert!(
        matches!(result, Err(OrderError::NotFound(Missing::Delivery))),
        "expected NotFound, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn admin_operations_require_an_admin() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.paid(product, 1).await?;

    let validate = h.engine.admin_validate(customer, order.uuid).await;
    let ship = h.engine.admin_ship(customer, order.uuid, None).await;
    let refund = h.engine.admin_refund(customer, order.uuid).await;
    let list = h.engine.list_orders(customer).await;

    assert!(matches!(validate, Err(OrderError::Forbidden)), "got {validate:?}");
    assert!(matches!(ship, Err(OrderError::Forbidden)), "got {ship:?}");
    assert!(matches!(refund, Err(OrderError::Forbidden)), "got {refund:?}");
    assert!(matches!(list, Err(OrderError::Forbidden)), "got {list:?}");

    Ok(())
}

#[tokio::test]
async fn customers_cannot_touch_other_customers_orders() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (owner, order) = h.ordered(product, 1).await?;
    let stranger = Actor::customer(UserUuid::new());

    let read = h.engine.order(stranger, order.uuid).await;
    let pay = h.engine.pay(stranger, order.uuid, &card(VISA)).await;
    let cancel = h.engine.cancel(stranger, order.uuid).await;
    let listing = h.engine.orders_for(stranger, owner.user).await;

    assert!(matches!(read, Err(OrderError::Forbidden)), "got {read:?}");
    assert!(matches!(pay, Err(OrderError::Forbidden)), "got {pay:?}");
    assert!(matches!(cancel, Err(OrderError::Forbidden)), "got {cancel:?}");
    assert!(matches!(listing, Err(OrderError::Forbidden)), "got {listing:?}");

    assert_eq!(h.engine.orders_for(owner, owner.user).await?.len(), 1);
    assert_eq!(h.engine.orders_for(h.admin, owner.user).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn missing_orders_are_not_found() -> TestResult {
    let h = harness()?;

    let result = h.engine.cancel(h.admin, OrderUuid::new()).await;

    assert!(
        matches!(result, Err(OrderError::NotFound(Missing::Order))),
        "expected NotFound, got {result:?}"
    );

    Ok(())
}

#[tokio::test]
async fn cancelling_an_unpaid_order_releases_stock_once() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 3).await?;
    let (customer, order) = h.ordered(product, 2).await?;

    assert_eq!(h.stock(product).await?.stock_qty, 1);

    let first = h.engine.cancel(customer, order.uuid).await?;

    assert_eq!(first.order.status, OrderStatus::Cancelled);
    assert_eq!(first.refunded, Money::ZERO);
    assert!(first.order.timeline.cancelled_at.is_some(), "cancelled_at must be set");
    assert!(first.order.timeline.refunded_at.is_none(), "unpaid order is not refunded");

    let second = h.engine.cancel(customer, order.uuid).await?;

    assert_eq!(second.order, first.order);
    assert_eq!(h.stock(product).await?.stock_qty, 3);

    Ok(())
}

#[tokio::test]
async fn concurrent_cancels_refund_and_release_once() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 2).await?;
    let (customer, order) = h.paid(product, 2).await?;

    let (a, b) = tokio::join!(
        h.engine.cancel(customer, order.uuid),
        h.engine.cancel(h.admin, order.uuid)
    );

    let (a, b) = (a?, b?);

    assert_eq!(a.order.status, OrderStatus::Refunded);
    assert_eq!(b.order.status, OrderStatus::Refunded);
    assert_eq!(a.refunded + b.refunded, Money::from_minor(3_000));
    assert_eq!(h.stock(product).await?.stock_qty, 2);

    Ok(())
}

#[tokio::test]
async fn admin_refund_only_applies_to_paid_orders() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 2).await?;

    let (_, unpaid) = h.ordered(product, 1).await?;

    let refused = h.engine.admin_refund(h.admin, unpaid.uuid).await;

    assert!(
        matches!(refused, Err(OrderError::InvalidState { status: OrderStatus::Created, .. })),
        "expected InvalidState, got {refused:?}"
    );

    let (_, paid) = h.paid(product, 1).await?;

    let refund = h.engine.admin_refund(h.admin, paid.uuid).await?;

    assert_eq!(refund.order.status, OrderStatus::Refunded);
    assert_eq!(refund.refunded, Money::from_minor(1_500));
    assert!(refund.order.timeline.cancelled_at.is_none(), "admin refund does not cancel");
    assert!(refund.order.timeline.refunded_at.is_some(), "refunded_at must be set");

    let replay = h.engine.admin_refund(h.admin, paid.uuid).await?;

    assert_eq!(replay.refunded, Money::ZERO);
    assert_eq!(h.stock(product).await?.stock_qty, 1);

    Ok(())
}

#[tokio::test]
async fn invoice_is_issued_once_per_paid_order() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 3).await?;

    let (customer, unpaid) = h.ordered(product, 1).await?;

    let early = h.engine.invoice(customer, unpaid.uuid).await;

    assert!(
        matches!(early, Err(OrderError::InvalidState { .. })),
        "expected InvalidState, got {early:?}"
    );

    let paid = h.engine.pay(customer, unpaid.uuid, &card(VISA)).await?;

    h.clock.advance(60);

    let first = h.engine.invoice(customer, unpaid.uuid).await?;
    let second = h.engine.invoice(h.admin, unpaid.uuid).await?;

    assert_eq!(first, paid.invoice);
    assert_eq!(first.uuid, second.uuid);
    assert_eq!(first.total, second.total);
    assert_eq!(first.total, Money::from_minor(1_500));

    h.engine.cancel(customer, unpaid.uuid).await?;

    assert_eq!(h.engine.invoice(customer, unpaid.uuid).await?.uuid, first.uuid);

    Ok(())
}

#[tokio::test]
async fn lifecycle_timestamps_never_move() -> TestResult {
    let h = harness()?;
    let product = h.product("Lampe", 1_500, 1).await?;
    let (customer, created) = h.ordered(product, 1).await?;

    h.clock.advance(60);
    let validated = h.engine.admin_validate(h.admin, created.uuid).await?;

    h.clock.advance(60);
    let paid = h.engine.pay(customer, created.uuid, &card(VISA)).await?.order;

    h.clock.advance(60);
    let shipped = h.engine.admin_ship(h.admin, created.uuid, None).await?.order;

    h.clock.advance(60);
    let delivered = h.engine.admin_mark_delivered(h.admin, created.uuid).await?.order;

    let history = [&created, &validated, &paid, &shipped, &delivered];

    for pair in history.windows(2) {
        if let [earlier, later] = pair {
            assert!(
                later.timeline.extends(&earlier.timeline),
                "{} must keep every timestamp of {}",
                later.status,
                earlier.status
            );
        }
    }

    assert_eq!(delivered.timeline.paid_at, Some(start()? + jiff::SignedDuration::from_secs(120)));
    assert_eq!(h.clock.now(), start()? + jiff::SignedDuration::from_secs(240));

    Ok(())
}

#[tokio::test]
async fn failing_to_empty_the_cart_abandons_the_order() -> TestResult {
    let mut carts = MockCartsStore::new();
    let user = UserUuid::new();

    let memory = Stores::memory();
    let product = memory
        .products
        .create_product(NewProduct {
            uuid: ProductUuid::new(),
            name: "Lampe".to_string(),
            price: Money::from_minor(1_500),
            stock_qty: 2,
            active: true,
        })
        .await?;

    let cart = CartRecord {
        user_uuid: user,
        items: vec![CartItemRecord {
            product_uuid: product.uuid,
            quantity: Quantity::new(2)?,
            added_at: start()?,
        }],
    };

    carts
        .expect_get_cart()
        .returning(move |_| Ok(cart.clone()));
    carts
        .expect_remove_items()
        .times(1)
        .returning(|_, _| Err(StoreError::Sql(sqlx::Error::PoolTimedOut)));

    let h = harness_with(Stores {
        carts: Arc::new(carts),
        ..memory
    })?;

    let result = h.engine.checkout(user).await;

    assert!(
        matches!(result, Err(OrderError::Storage(StoreError::Sql(_)))),
        "expected Storage, got {result:?}"
    );

    let orders = h.stores.orders.list_orders_for_user(user).await?;

    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().map(|o| o.status), Some(OrderStatus::Cancelled));
    assert_eq!(h.stock(product.uuid).await?.stock_qty, 2);
    assert!(h.stock(product.uuid).await?.active, "product must be reactivated");

    Ok(())
}

#[tokio::test]
async fn full_lifecycle_against_postgres() -> TestResult {
    let db = crate::test::TestDb::new().await;
    let h = harness_with(db.stores())?;
    let product = h.product("Lampe", 1_500, 2).await?;

    let (customer, order) = h.ordered(product, 2).await?;

    assert_eq!(h.stock(product).await?.stock_qty, 0);
    assert!(h.carts.get_cart(customer.user).await?.is_empty());

    let declined = h.engine.pay(customer, order.uuid, &card(DECLINED_VISA)).await;
    assert!(
        matches!(declined, Err(OrderError::PaymentDeclined { .. })),
        "expected PaymentDeclined, got {declined:?}"
    );

    h.clock.advance(60);
    let paid = h.engine.pay(customer, order.uuid, &card(VISA)).await?;

    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert_eq!(paid.invoice.total, Money::from_minor(3_000));
    assert_eq!(paid.invoice.lines.len(), 1);

    let keys: Vec<String> = h
        .engine
        .payments(customer, order.uuid)
        .await?
        .into_iter()
        .map(|payment| payment.idempotency_key)
        .collect();
    assert_eq!(keys, [format!("{}:1", order.uuid), format!("{}:2", order.uuid)]);

    assert_eq!(h.engine.invoice(customer, order.uuid).await?, paid.invoice);

    h.clock.advance(60);
    let shipment = h.engine.admin_ship(h.admin, order.uuid, None).await?;

    assert_eq!(shipment.delivery.carrier, DEFAULT_CARRIER);
    assert_eq!(shipment.delivery.status, DeliveryStatus::InTransit);

    h.clock.advance(60);
    let delivered = h.engine.admin_mark_delivered(h.admin, order.uuid).await?;

    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    assert_eq!(delivered.delivery.status, DeliveryStatus::Delivered);
    assert_eq!(
        h.engine.order(customer, order.uuid).await?.timeline,
        delivered.order.timeline
    );

    Ok(())
}

#[tokio::test]
async fn cancelling_a_paid_order_against_postgres_restores_stock() -> TestResult {
    let db = crate::test::TestDb::new().await;
    let h = harness_with(db.stores())?;
    let product = h.product("Lampe", 1_500, 1).await?;

    let (customer, order) = h.paid(product, 1).await?;

    let cancellation = h.engine.cancel(customer, order.uuid).await?;

    assert_eq!(cancellation.order.status, OrderStatus::Refunded);
    assert_eq!(cancellation.refunded, Money::from_minor(1_500));
    assert!(cancellation.order.timeline.cancelled_at.is_some());

    let restocked = h.stock(product).await?;
    assert_eq!(restocked.stock_qty, 1);
    assert!(restocked.active, "released stock must reactivate the product");

    let payments = h.engine.payments(customer, order.uuid).await?;
    assert!(payments.iter().all(|payment| payment.status == PaymentStatus::Refunded));

    Ok(())
}

/// Cart store that slips one more line into the cart right after the next
/// read, as a concurrent `add_to_cart` would.
#[derive(Default)]
struct InterleavedCarts {
    inner: MemoryCartsStore,
    late_addition: Mutex<Option<ProductUuid>>,
}

#[async_trait]
impl CartsStore for InterleavedCarts {
    async fn get_cart(&self, user: UserUuid) -> Result<CartRecord, StoreError> {
        let cart = self.inner.get_cart(user).await?;

        if let Some(product) = self.late_addition.lock().await.take() {
            self.inner.add_item(user, product, Quantity::ONE).await?;
        }

        Ok(cart)
    }

    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<CartRecord, StoreError> {
        self.inner.add_item(user, product, quantity).await
    }

    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: Option<Quantity>,
    ) -> Result<CartRecord, StoreError> {
        self.inner.remove_item(user, product, quantity).await
    }

    async fn remove_items(
        &self,
        user: UserUuid,
        items: &[(ProductUuid, Quantity)],
    ) -> Result<(), StoreError> {
        self.inner.remove_items(user, items).await
    }

    async fn clear_cart(&self, user: UserUuid) -> Result<(), StoreError> {
        self.inner.clear_cart(user).await
    }
}

#[tokio::test]
async fn items_added_during_checkout_stay_in_the_cart() -> TestResult {
    let carts = Arc::new(InterleavedCarts::default());

    let h = harness_with(Stores {
        carts: carts.clone(),
        ..Stores::memory()
    })?;

    let lamp = h.product("Lampe", 1_500, 3).await?;
    let rug = h.product("Tapis", 4_990, 3).await?;
    let user = UserUuid::new();

    h.add(user, lamp, 1).await?;
    h.add(user, rug, 1).await?;

    *carts.late_addition.lock().await = Some(rug);

    let order = h.engine.checkout(user).await?;

    assert_eq!(order.lines.len(), 2);

    let cart = h.carts.get_cart(user).await?;

    assert_eq!(cart.quantity_of(lamp), None);
    assert_eq!(
        cart.quantity_of(rug),
        Some(Quantity::ONE),
        "the unit added while checking out must stay in the cart"
    );

    Ok(())
}

/// Products store whose next release of one product fails.
#[derive(Default)]
struct FlakyProducts {
    inner: MemoryProductsStore,
    failing_release: Mutex<Option<ProductUuid>>,
}

#[async_trait]
impl ProductsStore for FlakyProducts {
    async fn list_products(&self, active_only: bool) -> Result<Vec<ProductRecord>, StoreError> {
        self.inner.list_products(active_only).await
    }

    async fn get_product(&self, product: ProductUuid) -> Result<ProductRecord, StoreError> {
        self.inner.get_product(product).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductRecord, StoreError> {
        self.inner.create_product(product).await
    }

    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<ProductRecord, StoreError> {
        self.inner.update_product(product, update).await
    }

    async fn reserve(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        self.inner.reserve(product, quantity).await
    }

    async fn release(
        &self,
        product: ProductUuid,
        quantity: Quantity,
    ) -> Result<Option<ProductRecord>, StoreError> {
        let mut failing = self.failing_release.lock().await;

        if *failing == Some(product) {
            failing.take();

            return Err(StoreError::Sql(sqlx::Error::PoolTimedOut));
        }

        self.inner.release(product, quantity).await
    }
}

fn flaky_harness() -> TestResult<(Harness, Arc<FlakyProducts>)> {
    let products = Arc::new(FlakyProducts::default());

    let h = harness_with(Stores {
        products: products.clone(),
        ..Stores::memory()
    })?;

    Ok((h, products))
}

#[tokio::test]
async fn failed_release_keeps_the_order_open_until_cancel_succeeds() -> TestResult {
    let (h, products) = flaky_harness()?;
    let lamp = h.product("Lampe", 1_500, 1).await?;
    let rug = h.product("Tapis", 4_990, 1).await?;
    let customer = Actor::customer(UserUuid::new());

    h.add(customer.user, lamp, 1).await?;
    h.add(customer.user, rug, 1).await?;

    let order = h.engine.checkout(customer.user).await?;

    *products.failing_release.lock().await = Some(rug);

    let failed = h.engine.cancel(customer, order.uuid).await;

    assert!(
        matches!(failed, Err(OrderError::Storage(StoreError::Sql(_)))),
        "expected Storage, got {failed:?}"
    );

    let open = h.engine.order(customer, order.uuid).await?;

    assert_eq!(open.status, OrderStatus::Created);
    assert!(open.timeline.cancelled_at.is_none(), "cancelled_at must stay empty");
    assert_eq!(h.stock(lamp).await?.stock_qty, 0, "released lamp must be taken back");
    assert_eq!(h.stock(rug).await?.stock_qty, 0);

    let cancelled = h.engine.cancel(customer, order.uuid).await?;

    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

    for product in [lamp, rug] {
        let restocked = h.stock(product).await?;

        assert_eq!(restocked.stock_qty, 1);
        assert!(restocked.active, "released stock must reactivate the product");
    }

    Ok(())
}

#[tokio::test]
async fn failed_release_during_refund_can_be_retried() -> TestResult {
    let (h, products) = flaky_harness()?;
    let lamp = h.product("Lampe", 1_500, 1).await?;
    let (_, order) = h.paid(lamp, 1).await?;

    *products.failing_release.lock().await = Some(lamp);

    let failed = h.engine.admin_refund(h.admin, order.uuid).await;

    assert!(
        matches!(failed, Err(OrderError::Storage(_))),
        "expected Storage, got {failed:?}"
    );
    assert_eq!(h.engine.order(h.admin, order.uuid).await?.status, OrderStatus::Paid);
    assert_eq!(h.stock(lamp).await?.stock_qty, 0);

    let refunded = h.engine.admin_refund(h.admin, order.uuid).await?;

    assert_eq!(refunded.order.status, OrderStatus::Refunded);
    assert_eq!(h.stock(lamp).await?.stock_qty, 1);

    let payments = h.engine.payments(h.admin, order.uuid).await?;

    assert_eq!(payments.len(), 1);
    assert!(payments.iter().all(|payment| payment.status == PaymentStatus::Refunded));

    Ok(())
}

#[tokio::test]
async fn succeeded_payments_without_a_transaction_are_not_refunded() -> TestResult {
    let h = harness()?;
    let lamp = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(lamp, 1).await?;

    let payment = h
        .stores
        .payments
        .create_payment(NewPayment {
            uuid: PaymentUuid::new(),
            order_uuid: order.uuid,
            amount: order.total(),
            idempotency_key: format!("{}:1", order.uuid),
            card_last4: "4242".to_string(),
            contact: PaymentContact::default(),
            created_at: h.clock.now(),
        })
        .await?;

    h.stores
        .payments
        .update_payment(
            payment.uuid,
            PaymentStatus::Pending,
            PaymentUpdate {
                status: PaymentStatus::Succeeded,
                transaction_id: None,
                failure_reason: None,
                updated_at: h.clock.now(),
            },
        )
        .await?;

    let mut paid = order.clone();
    paid.status = OrderStatus::Paid;
    paid.timeline.stamp(OrderStatus::Paid, h.clock.now());
    h.stores.orders.update_order(paid, OrderStatus::Created).await?;

    let result = h.engine.cancel(customer, order.uuid).await;

    assert!(
        matches!(result, Err(OrderError::Gateway(GatewayError::UnexpectedResponse(_)))),
        "expected Gateway, got {result:?}"
    );
    assert_eq!(h.engine.order(customer, order.uuid).await?.status, OrderStatus::Paid);
    assert_eq!(h.stock(lamp).await?.stock_qty, 0);

    Ok(())
}

/// Gateway that charges but loses the answer on the way back.
#[derive(Default)]
struct LostResponseGateway {
    inner: SandboxGateway,
}

#[async_trait]
impl PaymentGateway for LostResponseGateway {
    async fn charge(
        &self,
        card_number: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.inner
            .charge(card_number, amount, idempotency_key)
            .await?;

        Err(GatewayError::Unavailable)
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
        idempotency_key: &str,
    ) -> Result<RefundOutcome, GatewayError> {
        self.inner
            .refund(transaction_id, amount, idempotency_key)
            .await
    }

    async fn find_charge(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<ChargeOutcome>, GatewayError> {
        self.inner.find_charge(idempotency_key).await
    }
}

#[tokio::test]
async fn cancelling_refunds_a_charge_whose_answer_was_lost() -> TestResult {
    let h = harness()?;
    let lamp = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(lamp, 1).await?;

    let engine = OrderLifecycle::new(
        h.stores.clone(),
        Arc::new(LostResponseGateway::default()),
        h.clock.clone(),
    );

    let lost = engine.pay(customer, order.uuid, &card(VISA)).await;

    assert!(
        matches!(lost, Err(OrderError::Gateway(GatewayError::Unavailable))),
        "expected Gateway, got {lost:?}"
    );

    let cancelled = engine.cancel(customer, order.uuid).await?;

    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.refunded, Money::from_minor(1_500));
    assert_eq!(h.stock(lamp).await?.stock_qty, 1);

    let payments = engine.payments(customer, order.uuid).await?;

    assert_eq!(payments.len(), 1);
    assert_eq!(payments.first().map(|p| p.status), Some(PaymentStatus::Refunded));
    assert!(
        payments.first().is_some_and(|p| p.transaction_id.is_some()),
        "settled payment must carry the gateway transaction"
    );

    Ok(())
}

#[tokio::test]
async fn cancelling_fails_pending_payments_the_gateway_never_charged() -> TestResult {
    let h = harness()?;
    let lamp = h.product("Lampe", 1_500, 1).await?;
    let (customer, order) = h.ordered(lamp, 1).await?;

    let mut gateway = MockPaymentGateway::new();

    gateway
        .expect_charge()
        .times(1)
        .returning(|_, _, _| Err(GatewayError::Unavailable));

    let offline = OrderLifecycle::new(h.stores.clone(), Arc::new(gateway), h.clock.clone());

    let outage = offline.pay(customer, order.uuid, &card(VISA)).await;

    assert!(outage.is_err(), "expected a gateway error, got {outage:?}");

    let cancelled = h.engine.cancel(customer, order.uuid).await?;

    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.refunded, Money::ZERO);

    let payments = h.engine.payments(customer, order.uuid).await?;

    assert_eq!(payments.first().map(|p| p.status), Some(PaymentStatus::Failed));
    assert_eq!(h.gateway.executed_charges(), 0);

    Ok(())
}

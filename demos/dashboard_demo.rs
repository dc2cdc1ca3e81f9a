use chrono::NaiveDate;
use fincore_dashboard::*;
use std::error::Error;

const RECEIVABLES: &str = "\
ID,RUC,Cliente,Documento,Fecha_Emision,F_Venc,Monto,Tipo_Moneda,Cuenta_Contable,Saldo,Categoria,Proyecto_ID
1,20100000001,Constructora Andina,F001-101,45658,45688,\"S/ 12,500.00\",Soles,1212,\"S/ 12,500.00\",Obras,P-01
2,20100000002,Minera del Sur,F001-102,45672,45702,8300,Soles,1212,4150,Obras,P-02
3,20100000001,Constructora Andina,F001-103,45689,45780,2100,Dolares,1212,2100,Servicios,P-01
4,20100000003,Agroexport,F001-104,45600,45630,980,Soles,1212,980,Servicios,P-03
";

const PAYABLES: &str = "\
ID,RUC,Proveedor,Documento,Fecha_Emision,Vcto,Moneda,Saldo,Categoria,Proyecto_ID
1,20200000001,Cementos Lima,E001-11,45660,45690,Soles,5400,Materiales,P-01
2,20200000002,Transportes Rojas,E001-12,45670,45731,Soles,1250,Servicios,P-02
3,20200000003,Aceros Arequipa,E001-13,45675,45705,USD,3100,Materiales,P-01
";

const PROJECTS: &str = r#"[
  {"Proyecto_ID": "P-01", "Entidad": "Constructora Andina", "Proyecto": "Nave industrial",
   "Fecha": 45663, "Factura": "F001-101", "Sub_Total": 10593.22, "IGV": 1906.78, "Total": 12500,
   "Detraccion": 500, "Presupuesto_Neto": 80000, "Garantias": 4000, "Gastado": 36000,
   "Avance": 45, "Saldo": 44000, "Estado": "En ejecucion", "Etapa": "Construccion"},
  {"Proyecto_ID": "P-02", "Entidad": "Minera del Sur", "Proyecto": "Campamento",
   "Fecha": 45717, "Factura": "F001-102", "Sub_Total": 7033.9, "IGV": 1266.1, "Total": 8300,
   "Detraccion": 332, "Presupuesto_Neto": 45000, "Garantias": 2250, "Gastado": 9000,
   "Avance": 20, "Saldo": 36000, "Estado": "Pendiente", "Etapa": "Diseño"}
]"#;

const BALANCE: &str = "\
efectivo_y_equivalente_de_efectivo,cuentas_por_cobrar_comerciales,total_pasivo_corriente
\"S/ 18,000\",19730,21500
";

fn main() -> std::result::Result<(), Box<dyn Error>> {
    println!("📊 FinCore dashboard demo\n");

    let parser: Box<dyn TabularParser> = Box::new(CsvTableParser::new().with_number_inference(true));
    let mut session = DashboardSession::new(parser, DashboardConfig::default())?;

    let count = session.ingest(Domain::Receivable, RECEIVABLES.as_bytes())?;
    println!("✅ Receivables: {} rows", count);
    let count = session.ingest(Domain::Payable, PAYABLES.as_bytes())?;
    println!("✅ Payables: {} rows", count);
    let count = session.ingest_rows(Domain::Project, JsonRowsParser::new().parse(PROJECTS.as_bytes())?)?;
    println!("✅ Projects: {} rows", count);
    let count = session.ingest(Domain::Balance, BALANCE.as_bytes())?;
    println!("✅ Balance sheet: {} rows", count);

    if let Err(e) = session.ingest(Domain::Payable, b"Proveedor,Importe\nX,1\n") {
        println!("⚠️  Rejected upload kept the previous payables: {}", e);
    }

    let now = NaiveDate::from_ymd_opt(2025, 3, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or("invalid demo date")?;
    let dataset = session.process(now)?;
    let summary = session.summary().ok_or("dashboard not processed")?;

    println!("\n=== Vision ({}) ===", now.date());
    println!("Receivables:      {:>12.2}", summary.total_receivables);
    println!("Payables:         {:>12.2}", summary.total_payables);
    println!("Net flow:         {:>12.2}", summary.net_flow);
    println!("Liquidity ratio:  {:>12.2}", summary.liquidity_ratio);
    match summary.acid_test {
        Some(value) => println!("Acid test:        {:>12.2}", value),
        None => println!("Acid test:        {:>12}", "n/a"),
    }

    println!("\nReceivables aging:");
    for (bucket, total) in summary.receivables_aging.iter() {
        println!("  {:<10} {:>12.2}", bucket.label(), total);
    }

    println!("\nTop debtors:");
    for debtor in &summary.top_debtors {
        println!("  {:<24} {:>12.2}", debtor.entity, debtor.total);
    }

    println!("\nOverdue receivables:");
    for record in dataset.receivables.iter().filter(|r| r.is_overdue()) {
        println!(
            "  {:<24} {:>10.2}  {} days ({})",
            record.entity().unwrap_or_default(),
            record.balance(),
            record.days_overdue(),
            record.aging_bucket().label()
        );
    }

    let portfolio = session
        .project_portfolio(None)
        .ok_or("dashboard not processed")?;
    println!("\n=== Projects ===");
    println!("Net budget:       {:>12.2}", portfolio.total_net_budget);
    println!("Executed:         {:>12.2}", portfolio.execution.executed);
    println!("Execution:        {:>11.1}%", portfolio.execution.percent);
    println!("In execution:     {:>12}", portfolio.in_execution);
    for stage in &portfolio.projects_by_stage {
        println!("  {:<16} {}", stage.stage, stage.count);
    }

    let materials = session
        .payables_view(Some("materiales"))
        .ok_or("dashboard not processed")?;
    println!(
        "\nMaterials payables: {:.2} overdue, {:.2} not due",
        materials.overdue, materials.not_due
    );

    Ok(())
}

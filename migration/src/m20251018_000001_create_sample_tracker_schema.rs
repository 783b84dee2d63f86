use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)] // One table definition per store
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Samples::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Samples::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Samples::SequenceNumber)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Samples::SampleId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Samples::RequestRefNo).text().not_null())
                    .col(ColumnDef::new(Samples::SampleRefNo).text())
                    .col(ColumnDef::new(Samples::Origin).text())
                    .col(ColumnDef::new(Samples::Destination).text())
                    .col(ColumnDef::new(Samples::SampleRoute).text())
                    .col(ColumnDef::new(Samples::TestMethod).text())
                    .col(ColumnDef::new(Samples::Remarks).text())
                    .col(ColumnDef::new(Samples::SampleInDate).string())
                    .col(ColumnDef::new(Samples::SampleInTime).string())
                    .col(ColumnDef::new(Samples::GatePassNo).string())
                    .col(
                        ColumnDef::new(Samples::Received)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Samples::ReceivedDate).string())
                    .col(ColumnDef::new(Samples::ReceivedTime).string())
                    .col(ColumnDef::new(Samples::AnalysedBy).text())
                    .col(ColumnDef::new(Samples::CompletedDate).string())
                    .col(ColumnDef::new(Samples::CompletedTime).string())
                    .col(
                        ColumnDef::new(Samples::IsFinalized)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Samples::FinalizedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Samples::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Samples::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Samples::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Samples::NotificationSentAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Samples::NotificationAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Samples::NotificationError).text())
                    .col(
                        ColumnDef::new(Samples::NotificationInFlight)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_samples_created_by")
                            .from(Samples::Table, Samples::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SampleResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SampleResults::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SampleResults::SampleId).uuid().not_null())
                    .col(ColumnDef::new(SampleResults::Position).integer().not_null())
                    .col(ColumnDef::new(SampleResults::AsPpb).text().not_null())
                    .col(ColumnDef::new(SampleResults::SbPpb).text().not_null())
                    .col(ColumnDef::new(SampleResults::AlPpb).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sample_results_sample_id")
                            .from(SampleResults::Table, SampleResults::SampleId)
                            .to(Samples::Table, Samples::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // Result rows are positional within a sample
        manager
            .create_index(
                Index::create()
                    .name("sample_results_sample_position_unique")
                    .table(SampleResults::Table)
                    .col(SampleResults::SampleId)
                    .col(SampleResults::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChemicalRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChemicalRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChemicalRequests::ChemicalName).string().not_null())
                    .col(ColumnDef::new(ChemicalRequests::CustomChemical).text())
                    .col(ColumnDef::new(ChemicalRequests::Quantity).string().not_null())
                    .col(ColumnDef::new(ChemicalRequests::HandOverRange).string().not_null())
                    .col(
                        ColumnDef::new(ChemicalRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReferenceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReferenceRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReferenceRecords::RefNumber).string().not_null())
                    .col(ColumnDef::new(ReferenceRecords::FileName).string())
                    .col(ColumnDef::new(ReferenceRecords::ContentType).string())
                    .col(ColumnDef::new(ReferenceRecords::FileData).text())
                    .col(
                        ColumnDef::new(ReferenceRecords::SampleOut)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ReferenceRecords::SampleOutAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ReferenceRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerSamples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerSamples::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerSamples::ReferenceNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CustomerSamples::Quantity).string().not_null())
                    .col(ColumnDef::new(CustomerSamples::Grade).string().not_null())
                    .col(ColumnDef::new(CustomerSamples::SampleDate).string())
                    .col(ColumnDef::new(CustomerSamples::SampleTime).string())
                    .col(
                        ColumnDef::new(CustomerSamples::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomerSamples::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReferenceRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChemicalRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SampleResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Samples::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
    LastUpdated,
}

#[derive(DeriveIden)]
enum Samples {
    Table,
    Id,
    SequenceNumber,
    SampleId,
    RequestRefNo,
    SampleRefNo,
    Origin,
    Destination,
    SampleRoute,
    TestMethod,
    Remarks,
    SampleInDate,
    SampleInTime,
    GatePassNo,
    Received,
    ReceivedDate,
    ReceivedTime,
    AnalysedBy,
    CompletedDate,
    CompletedTime,
    IsFinalized,
    FinalizedAt,
    CreatedBy,
    CreatedAt,
    LastUpdated,
    NotificationSentAt,
    NotificationAttempts,
    NotificationError,
    NotificationInFlight,
}

#[derive(DeriveIden)]
enum SampleResults {
    Table,
    Id,
    SampleId,
    Position,
    AsPpb,
    SbPpb,
    AlPpb,
}

#[derive(DeriveIden)]
enum ChemicalRequests {
    Table,
    Id,
    ChemicalName,
    CustomChemical,
    Quantity,
    HandOverRange,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ReferenceRecords {
    Table,
    Id,
    RefNumber,
    FileName,
    ContentType,
    FileData,
    SampleOut,
    SampleOutAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CustomerSamples {
    Table,
    Id,
    ReferenceNumber,
    Quantity,
    Grade,
    SampleDate,
    SampleTime,
    CreatedAt,
}
